// crates/fncli/src/render.rs

use fncore::{ConsoleError, ErrorKind, ExecutionResult, FunctionRecord, MetricSample};

pub fn print_record(record: &FunctionRecord) {
    println!("📋 {} (id {})", record.name, record.id);
    println!("   Route: {}", record.route);
    println!("   Language: {}", record.language);
    println!("   Timeout: {}s", record.timeout);
    if !record.environment_variables.is_empty() {
        println!("   Environment:");
        for (key, value) in &record.environment_variables {
            println!("     {}={}", key, value);
        }
    }
    if let Some(updated) = record.updated_at {
        println!("   Updated: {}", updated.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S"));
    }
    println!();
    println!("{}", record.code);
}

pub fn print_record_row(record: &FunctionRecord) {
    println!(
        "  • [{}] {} ({}, {}s) {}",
        record.id, record.name, record.language, record.timeout, record.route
    );
}

pub fn print_metrics(samples: &[MetricSample]) {
    if samples.is_empty() {
        println!("   No executions recorded yet");
        return;
    }

    println!("   {:<10} {:>12} {:>12} {:>8}  {}", "time", "exec (s)", "memory (MB)", "cpu (%)", "status");
    for sample in samples {
        println!(
            "   {:<10} {:>12.4} {:>12.2} {:>8.2}  {}",
            sample.local_timestamp().format("%H:%M:%S"),
            sample.execution_time,
            sample.memory_usage,
            sample.cpu_usage,
            sample.status.as_deref().unwrap_or("-")
        );
        if let Some(message) = &sample.error_message {
            println!("              ↳ {}", message);
        }
    }
}

pub fn print_execution(result: &ExecutionResult) {
    println!("✅ Execution succeeded");
    println!();
    println!("📤 Result:");
    match serde_json::to_string_pretty(&result.result) {
        Ok(pretty) => println!("{}", pretty),
        Err(_) => println!("{}", result.result),
    }
    println!();
    println!("📊 Metrics:");
    println!("   Execution time: {:.4}s", result.metrics.execution_time);
    println!("   Memory usage:   {:.2}MB", result.metrics.memory_usage);
    println!("   CPU usage:      {:.2}%", result.metrics.cpu_usage);
}

/// Operator guidance for an error kind
pub fn hint(error: &ConsoleError, backend_url: &str) -> String {
    match error.kind() {
        ErrorKind::InputParse => {
            r#"Input must be valid JSON, e.g. '{"num1": 5, "num2": 3}'"#.to_string()
        }
        ErrorKind::Connectivity => format!("Is the backend running at {}?", backend_url),
        ErrorKind::Validation => "The backend rejected the definition; check name, route and timeout".to_string(),
        ErrorKind::NotFound => "No such function; run `fnctl list` to see what exists".to_string(),
        ErrorKind::Execution => "The function ran but failed; check its code and the input shape".to_string(),
        ErrorKind::Backend => "The backend returned an unexpected response".to_string(),
        ErrorKind::Transition => "That step is not possible right now".to_string(),
    }
}

pub fn print_error(error: &ConsoleError, backend_url: &str) {
    eprintln!("❌ {}", error);
    eprintln!("   {}", hint(error, backend_url));
}
