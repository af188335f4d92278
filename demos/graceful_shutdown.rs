//! Graceful shutdown example
//!
//! Demonstrates cooperative cancellation and the staged shutdown sequence:
//! new submissions are rejected, pending jobs resolve as cancelled, and
//! running jobs get a bounded grace period to observe their token.
//!
//! Run with: RUST_LOG=debug cargo run --example graceful_shutdown

use job_queue_system::prelude::*;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    env_logger::init();

    println!("=== Job Queue System - Graceful Shutdown Example ===\n");

    let config = JobQueueConfig::new(2)
        .with_poll_interval(Duration::from_millis(20))
        .with_thread_name_prefix("shutdown-demo");
    let queue = JobQueue::with_config(config)?;
    println!("1. Created queue with capacity {}", queue.capacity());

    println!("\n2. Submitting a cooperative long-running job:");
    let cooperative = queue.execute(|token| {
        for step in 0..100 {
            token.check()?;
            thread::sleep(Duration::from_millis(10));
            if step % 20 == 0 {
                println!("   cooperative job at step {}", step);
            }
        }
        Ok("finished all 100 steps")
    })?;

    println!("\n3. Submitting quick jobs behind it:");
    let mut quick = Vec::new();
    for i in 0..4u32 {
        let handle = queue.execute(move |_token| {
            thread::sleep(Duration::from_millis(30));
            Ok(i)
        })?;
        quick.push(handle);
    }

    // Let the queue make some progress before pulling the plug
    thread::sleep(Duration::from_millis(120));

    println!("\n4. Requesting shutdown with a 1 second grace period...");
    queue.shutdown(Duration::from_secs(1))?;
    println!(
        "   Shutdown returned, {} jobs still in flight",
        queue.in_flight()
    );

    println!("\n5. Every handle still resolves:");
    match cooperative.wait() {
        JobOutcome::Succeeded(message) => println!("   cooperative job finished: {}", message),
        JobOutcome::Cancelled => println!("   cooperative job observed the shutdown and stopped"),
        JobOutcome::Failed(error) => println!("   cooperative job failed: {}", error),
    }
    for (i, handle) in quick.into_iter().enumerate() {
        println!("   quick job {}: {:?}", i, handle.wait());
    }

    println!("\n6. Submissions after shutdown are rejected:");
    match queue.execute(|_token| Ok(())) {
        Err(error) => println!("   rejected: {}", error),
        Ok(_) => println!("   unexpectedly accepted"),
    }

    println!("\n7. Final statistics:");
    let stats = queue.stats();
    println!("   Submitted: {}", stats.jobs_submitted);
    println!("   Succeeded: {}", stats.jobs_succeeded);
    println!("   Cancelled: {}", stats.jobs_cancelled);

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
