// Loss of precision is allowable in this module's use cases.
#![allow(clippy::cast_precision_loss)]

use std::time::{Duration, Instant};

use humantime::format_duration;
use log::info;
use serde::Serialize;

/// Runs `f` and returns its result along with the elapsed wall time.
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}

/// Wall time of both engines and the derived speedup figures.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct SpeedupReport {
    pub sequential: Duration,
    pub partitioned: Duration,
    pub workers: usize,
    /// `sequential / partitioned`, or zero if the partitioned run took no measurable time
    pub speedup: f64,
    /// `speedup / workers`
    pub efficiency: f64,
}

impl SpeedupReport {
    pub fn new(sequential: Duration, partitioned: Duration, workers: usize) -> SpeedupReport {
        let speedup = if partitioned.is_zero() {
            0.0
        } else {
            sequential.as_secs_f64() / partitioned.as_secs_f64()
        };
        let efficiency = if workers > 0 {
            speedup / workers as f64
        } else {
            0.0
        };
        SpeedupReport {
            sequential,
            partitioned,
            workers,
            speedup,
            efficiency,
        }
    }
}

/// Prints the speedup report to the console.
pub fn print_speedup_report(report: &SpeedupReport) {
    println!("━━━━ Execution Summary ━━━━");
    println!(
        "{:<25}{}",
        "Sequential time:",
        format_duration(report.sequential)
    );
    println!(
        "{:<25}{}",
        "Partitioned time:",
        format_duration(report.partitioned)
    );
    println!("{:<25}{}", "Workers:", report.workers);
    println!("{:<25}{:.3}", "Speedup:", report.speedup);
    println!("{:<25}{:.3}", "Efficiency:", report.efficiency);
}

/// Logs the speedup report with the logging system.
pub fn log_speedup_report(report: &SpeedupReport) {
    info!("Execution complete.");
    info!("Sequential time: {}", format_duration(report.sequential));
    info!("Partitioned time: {}", format_duration(report.partitioned));
    info!(
        "Speedup: {:.3}, efficiency: {:.3} over {} workers",
        report.speedup, report.efficiency, report.workers
    );
}
