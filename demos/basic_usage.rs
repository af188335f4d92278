//! Basic job queue usage example
//!
//! Demonstrates queue creation, job submission, typed completion handles,
//! and statistics tracking.
//!
//! Run with: cargo run --example basic_usage

use job_queue_system::prelude::*;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Job Queue System - Basic Usage Example ===\n");

    // Create a queue that runs at most 4 jobs at once
    let queue = JobQueue::with_capacity(4)?;
    println!("1. Created queue with capacity {}", queue.capacity());

    println!("\n2. Submitting simple jobs:");
    let mut handles = Vec::new();
    for i in 0..10u64 {
        let handle = queue.execute(move |_token| {
            println!(
                "  Job {} executing on thread {:?}",
                i,
                thread::current().name().unwrap_or("?")
            );
            thread::sleep(Duration::from_millis(50));
            Ok(i * i)
        })?;
        handles.push(handle);
    }
    println!("   Submitted 10 jobs");

    println!("\n3. Collecting typed results:");
    for (i, handle) in (0..10u64).zip(handles) {
        match handle.wait() {
            JobOutcome::Succeeded(square) => println!("   Job {}: {} squared is {}", i, i, square),
            other => println!("   Job {}: unexpected outcome {:?}", i, other),
        }
    }

    println!("\n4. Named jobs carry an id and description:");
    let report = queue.submit("weekly-report", "aggregate the weekly numbers", |_token| {
        thread::sleep(Duration::from_millis(30));
        Ok(String::from("42 widgets shipped"))
    })?;
    println!("   Job '{}' finished: {:?}", report.job_id(), report.wait());

    println!("\n5. A failing job resolves its handle with the error:");
    let doomed = queue.execute(|_token| -> Result<()> {
        Err(JobError::execution_failed("simulated disk full"))
    })?;
    if let JobOutcome::Failed(error) = doomed.wait() {
        println!("   Failure reported: {}", error);
    }

    println!("\n6. Queue statistics:");
    let stats = queue.stats();
    println!("   Submitted: {}", stats.jobs_submitted);
    println!("   Succeeded: {}", stats.jobs_succeeded);
    println!("   Failed:    {}", stats.jobs_failed);
    println!("   Success rate: {:.1}%", stats.success_rate());

    println!("\n7. Shutting down queue...");
    queue.shutdown(Duration::from_secs(5))?;

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
