use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use kumori_engine::default_registry;

#[derive(Args)]
pub struct ListArgs {
    /// Provider whose catalog to list
    #[arg(long, default_value = "aws")]
    pub cloud: String,

    #[arg(long, value_enum, default_value_t = ListFormat::Console)]
    pub format: ListFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum ListFormat {
    Console,
    Json,
}

pub fn execute(args: ListArgs) -> Result<()> {
    let registry = default_registry(&args.cloud);

    match args.format {
        ListFormat::Console => {
            println!(
                "{} plugins for {}:",
                registry.len().to_string().bold(),
                args.cloud.bold()
            );
            for plugin in registry.iter() {
                println!(
                    "  {}  {} ({})",
                    plugin.id().bold(),
                    plugin.title(),
                    plugin.category().dimmed()
                );
                println!("      apis: {}", plugin.apis().join(", ").dimmed());
                if !plugin.compliance().is_empty() {
                    let programs: Vec<&str> =
                        plugin.compliance().iter().map(|(name, _)| *name).collect();
                    println!("      compliance: {}", programs.join(", ").dimmed());
                }
            }
        }
        ListFormat::Json => {
            let entries: Vec<serde_json::Value> = registry
                .iter()
                .map(|plugin| {
                    serde_json::json!({
                        "id": plugin.id(),
                        "title": plugin.title(),
                        "category": plugin.category(),
                        "description": plugin.description(),
                        "apis": plugin.apis(),
                        "compliance": plugin
                            .compliance()
                            .iter()
                            .map(|(name, clause)| (name.to_string(), clause.to_string()))
                            .collect::<std::collections::BTreeMap<_, _>>(),
                        "types": plugin.types(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }

    Ok(())
}
