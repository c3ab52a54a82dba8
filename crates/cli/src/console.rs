//! Console rendering of scan results, one block per plugin as findings
//! stream in.

use anyhow::Result;
use colored::{ColoredString, Colorize};
use kumori_engine::{Finding, OutputSink, Plugin, Status};

pub struct ConsoleSink {
    ignore_ok: bool,
    current_plugin: Option<String>,
    counts: [usize; 4],
}

impl ConsoleSink {
    pub fn new(ignore_ok: bool) -> Self {
        Self {
            ignore_ok,
            current_plugin: None,
            counts: [0; 4],
        }
    }

    fn paint(status: Status) -> ColoredString {
        // Pad before coloring: ANSI escapes would otherwise count toward
        // the column width.
        let label = format!("{:<8}", status.to_string());
        match status {
            Status::Pass => label.green(),
            Status::Warn => label.yellow(),
            Status::Fail => label.red(),
            Status::Unknown => label.magenta(),
        }
    }
}

impl OutputSink for ConsoleSink {
    fn write_result(
        &mut self,
        finding: &Finding,
        plugin: &dyn Plugin,
        plugin_id: &str,
        compliance: Option<&str>,
    ) -> Result<()> {
        self.counts[finding.status.code() as usize] += 1;

        if self.ignore_ok && finding.status == Status::Pass {
            return Ok(());
        }

        if self.current_plugin.as_deref() != Some(plugin_id) {
            println!();
            println!("{} - {}", plugin.category().bold(), plugin.title().bold());
            self.current_plugin = Some(plugin_id.to_string());
        }

        let region = finding.region.as_deref().unwrap_or("global");
        let resource = finding.resource.as_deref().unwrap_or("N/A");
        println!(
            "  {} {:<16} {}: {}",
            Self::paint(finding.status),
            region,
            resource,
            finding.message
        );
        if let Some(compliance) = compliance {
            println!("           {}", compliance.dimmed());
        }

        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let [pass, warn, fail, unknown] = self.counts;
        println!();
        println!(
            "Scan complete: {} OK, {} WARN, {} FAIL, {} UNKNOWN",
            pass, warn, fail, unknown
        );
        Ok(())
    }
}
