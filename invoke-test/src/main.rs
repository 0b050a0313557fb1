use aws_config::BehaviorVersion;
use aws_sdk_lambda::Client;
use clap::Parser;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::Instant;

const GREETING: &str = "Hello world v1!";

#[derive(Default)]
struct Stats {
    success_count: usize,
    mismatch_count: usize,
    error_count: usize,
    total_latency_ms: f64,
}

#[derive(Deserialize)]
struct InvokeResponse {
    #[serde(rename = "statusCode")]
    status_code: u16,
    body: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Greeting {
    message: String,
    input: Value,
}

#[derive(Parser, Debug)]
#[command(name = "invoke-test")]
#[command(about = "Invoke the greeting function with generated events and check the echo")]
struct Args {
    /// Lambda function name
    function: String,

    /// Number of iterations to run
    #[arg(long, default_value = "100")]
    iters: usize,

    /// Number of parallel threads
    #[arg(long, default_value = "1")]
    threads: usize,

    /// Seed for event generation; each thread offsets it by its id
    #[arg(long)]
    seed: Option<u64>,
}

const NAMES: [&str; 5] = ["Ada", "Grace", "Alan", "Edsger", "Barbara"];

/// Generates a JSON event of a random shape. Floats are left out so the echo
/// can be compared exactly after a round trip through the function.
fn random_event(rng: &mut StdRng) -> Value {
    let name = NAMES[rng.gen_range(0..NAMES.len())];
    match rng.gen_range(0..7) {
        0 => Value::Null,
        1 => json!(rng.gen::<bool>()),
        2 => json!(rng.gen_range(-1_000_000i64..=1_000_000)),
        3 => json!(name),
        4 => json!({}),
        5 => json!({ "name": name, "id": rng.gen::<u32>() }),
        _ => {
            let len = rng.gen_range(0..5);
            let items: Vec<i64> = (0..len).map(|_| rng.gen_range(-100..100)).collect();
            json!({
                "name": name,
                "items": items,
                "meta": { "nested": true, "note": null }
            })
        }
    }
}

/// Checks a raw invocation result against the greeting contract for `event`.
fn check_response(event: &Value, raw: &str) -> anyhow::Result<()> {
    let response: InvokeResponse = serde_json::from_str(raw)?;
    if response.status_code != 200 {
        anyhow::bail!("unexpected status code {}", response.status_code);
    }

    let greeting: Greeting = serde_json::from_str(&response.body)?;
    if greeting.message != GREETING {
        anyhow::bail!("unexpected message {:?}", greeting.message);
    }
    if greeting.input != *event {
        anyhow::bail!("input was not echoed verbatim: {}", greeting.input);
    }

    let reparsed: Value = serde_json::from_str(&response.body)?;
    if serde_json::to_string_pretty(&reparsed)? != response.body {
        anyhow::bail!("body is not pretty-printed with two-space indent");
    }

    Ok(())
}

async fn run_invocations(
    client: Arc<Client>,
    function_name: String,
    thread_id: usize,
    start: usize,
    end: usize,
    total: usize,
    seed: Option<u64>,
    stats: Arc<Mutex<Stats>>,
) {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(thread_id as u64)),
        None => StdRng::from_entropy(),
    };

    for i in start..=end {
        let event = random_event(&mut rng);

        let started = Instant::now();
        let result = client
            .invoke()
            .function_name(&function_name)
            .payload(aws_sdk_lambda::primitives::Blob::new(event.to_string()))
            .send()
            .await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(response) => {
                let response_payload = response
                    .payload()
                    .map(|b| String::from_utf8_lossy(b.as_ref()).to_string())
                    .unwrap_or_else(|| "No response".to_string());

                let verdict = if response.function_error().is_some() {
                    Err(anyhow::anyhow!("function error: {response_payload}"))
                } else {
                    check_response(&event, &response_payload)
                };

                {
                    let mut stats = stats.lock().await;
                    match verdict {
                        Ok(()) => {
                            stats.success_count += 1;
                            stats.total_latency_ms += latency_ms;
                        }
                        Err(_) => stats.mismatch_count += 1,
                    }
                }

                match verdict {
                    Ok(()) => println!(
                        "[Thread {}: {}/{}] {} => ok ({:.3}ms)",
                        thread_id, i, total, event, latency_ms
                    ),
                    Err(e) => eprintln!(
                        "[Thread {}: {}/{}] {} => mismatch: {}",
                        thread_id, i, total, event, e
                    ),
                }
            }
            Err(e) => {
                {
                    let mut stats = stats.lock().await;
                    stats.error_count += 1;
                }

                eprintln!(
                    "[Thread {}: {}/{}] Error invoking with {}: {}",
                    thread_id, i, total, event, e
                );
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let threads = args.threads.max(1);

    println!(
        "Running {} invocations across {} thread(s)",
        args.iters, threads
    );

    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let client = Arc::new(Client::new(&config));

    let stats = Arc::new(Mutex::new(Stats::default()));

    let iters_per_thread = args.iters / threads;
    let remainder = args.iters % threads;

    let mut tasks = JoinSet::new();

    let total_iters = args.iters;

    let mut start = 1;
    for t in 1..=threads {
        let end = if t == threads {
            start + iters_per_thread + remainder - 1
        } else {
            start + iters_per_thread - 1
        };
        if end < start {
            continue;
        }

        let client = Arc::clone(&client);
        let function_name = args.function.clone();
        let stats = Arc::clone(&stats);
        let seed = args.seed;

        tasks.spawn(async move {
            run_invocations(
                client,
                function_name,
                t,
                start,
                end,
                total_iters,
                seed,
                stats,
            )
            .await;
        });

        start = end + 1;
    }

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            eprintln!("Task failed: {}", e);
        }
    }

    let stats = stats.lock().await;
    println!("Completed {} invocations", args.iters);
    println!();
    println!("Results:");
    println!("  Success:    {}", stats.success_count);
    println!("  Mismatches: {}", stats.mismatch_count);
    println!("  Errors:     {}", stats.error_count);
    if stats.success_count > 0 {
        let avg_latency = stats.total_latency_ms / stats.success_count as f64;
        println!("  Avg latency: {:.3}ms", avg_latency);
    }
}
