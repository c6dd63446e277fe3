use std::io::{self, Write};

use serde::Serialize;

use crate::app::RunReport;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_run(result: &RunReport) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub fn print_summary(result: &RunReport) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let reset = "\x1b[0m";

    println!(
        "{green}Wrote {} charts to {}{reset}",
        result.charts.len(),
        result.output
    );
    for name in &result.charts {
        println!("  {name}");
    }
    if !result.failed_queries.is_empty() {
        println!(
            "{yellow}Failed queries: {}{reset}",
            result.failed_queries.join(", ")
        );
    }
}
