use newsbrief::llm::remote::RemoteSummaryProvider;
use newsbrief::llm::SummaryProvider;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let api_key = std::env::var("LLM_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .expect("Set LLM_API_KEY or OPENAI_API_KEY environment variable");

    // Allow custom base URL or use OpenAI default
    let base_url = std::env::var("LLM_BASE_URL")
        .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());

    let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

    println!("\n{}", "=".repeat(60));
    println!("Testing summarization oracle");
    println!("Base URL: {}", base_url);
    println!("Model: {}", model);
    println!("{}", "=".repeat(60));

    let provider = RemoteSummaryProvider::new(&base_url, &api_key, &model).with_defaults(30, 500, 0.7);

    // Test 1: Regular article
    let test_article = r#"
The city council approved a new tram line on Tuesday after two years of
public consultation. The 12-kilometre route will connect the harbour
district with the central station and is expected to carry 40,000
passengers a day when it opens in 2028.

Construction is budgeted at 310 million euros, with a third covered by a
national infrastructure grant. Local businesses along the route have been
promised compensation during the three-year construction period.
    "#;

    println!("\n[Test 1] Summarizing article...");
    match provider.summarize(test_article, "City Desk").await {
        Ok(brief) => {
            println!("✓ Success!");
            for line in brief.lines() {
                println!("  {}", line);
            }
        }
        Err(e) => {
            eprintln!("✗ Failed: {}", e);
        }
    }

    // Test 2: Short article (should still work)
    let short_article = "The central bank held interest rates steady at 2.5 percent.";

    println!("\n[Test 2] Summarizing short article...");
    match provider.summarize(short_article, "Economy Wire").await {
        Ok(brief) => {
            println!("✓ Success!");
            println!("  {}", brief.replace('\n', " / "));
        }
        Err(e) => {
            eprintln!("✗ Failed: {}", e);
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("Tests completed");
    println!("{}", "=".repeat(60));
}
