use clap::{Parser, Subcommand};
use loomaa::tmdl::reader::{read_folder, Document};
use loomaa::tmdl::Vocabulary;
use loomaa::{compile_to_dir, declaration, validate, CompileOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use unicode_width::UnicodeWidthStr;

#[derive(Parser)]
#[command(name = "loomaa")]
#[command(about = "Compile semantic model declarations to TMDL and viewer JSON")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Compile a model declaration")]
    Compile {
        #[arg(help = "Path to the declaration (.yaml, .yml or .json)")]
        declaration: PathBuf,
        #[arg(
            long,
            short,
            env = "LOOMAA_OUT_DIR",
            default_value = "compiled",
            help = "Output directory"
        )]
        output: PathBuf,
        #[arg(long, default_value = "en-US", help = "Model culture")]
        culture: String,
    },
    #[command(about = "Validate a model declaration without writing output")]
    Validate {
        #[arg(help = "Path to the declaration")]
        declaration: PathBuf,
    },
    #[command(about = "Summarize a compiled .SemanticModel folder")]
    Inspect {
        #[arg(help = "Path to the .SemanticModel folder")]
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile {
            declaration,
            output,
            culture,
        } => run_compile(declaration, output, culture),
        Commands::Validate { declaration } => run_validate(declaration),
        Commands::Inspect { path } => run_inspect(path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run_compile(path: PathBuf, output: PathBuf, culture: String) -> Result<(), String> {
    let model = declaration::load(&path).map_err(|e| e.to_string())?;
    let options = CompileOptions {
        culture,
        ..CompileOptions::default().with_output_dir(output)
    };

    let artifacts = compile_to_dir(&model, &options).map_err(|e| e.to_string())?;
    for warning in &artifacts.report.warnings {
        eprintln!("warning: {}", warning);
    }
    println!(
        "Compiled {} into {}",
        artifacts.model_name,
        options
            .output_dir
            .join(artifacts.definition_dir_name())
            .display()
    );
    Ok(())
}

fn run_validate(path: PathBuf) -> Result<(), String> {
    let model = declaration::load(&path).map_err(|e| e.to_string())?;
    let report = validate(&model).map_err(|e| e.to_string())?;

    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }
    let measures = model.all_measures().count();
    println!(
        "{} is valid: {} tables, {} measures, {} relationships",
        model.name,
        model.tables.len(),
        measures,
        model.relationships.len()
    );
    Ok(())
}

fn run_inspect(path: PathBuf) -> Result<(), String> {
    let document = read_folder(&path).map_err(|e| e.to_string())?;
    print!("{}", render_summary(&document));
    Ok(())
}

/// Pad to a display width, counting wide characters as two columns.
fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(UnicodeWidthStr::width(text));
    format!("{}{}", text, " ".repeat(fill))
}

fn render_summary(document: &Document) -> String {
    let mut output = String::new();

    for table in &document.tables {
        let mode = table.mode.map(|m| m.label()).unwrap_or("?");
        output.push_str(&format!("table {} ({})\n", table.name, mode));

        let width = table
            .columns
            .iter()
            .map(|c| UnicodeWidthStr::width(c.name.as_str()))
            .max()
            .unwrap_or(0);
        for column in &table.columns {
            let dtype = column.data_type.map(|t| t.label()).unwrap_or("?");
            output.push_str(&format!("  {}  {}\n", pad(&column.name, width), dtype));
        }
        for column in &table.calculated_columns {
            output.push_str(&format!("  {}  (calculated)\n", column.name));
        }
        for measure in &table.measures {
            output.push_str(&format!("  measure {}\n", measure.name));
        }
    }

    for measure in &document.measures {
        output.push_str(&format!("measure {}\n", measure.name));
    }

    let width = document
        .relationships
        .iter()
        .map(|r| UnicodeWidthStr::width(format!("{}[{}]", r.from_table, r.from_column).as_str()))
        .max()
        .unwrap_or(0);
    for rel in &document.relationships {
        let from = format!("{}[{}]", rel.from_table, rel.from_column);
        output.push_str(&format!(
            "{} -> {}[{}]  {} {}{}\n",
            pad(&from, width),
            rel.to_table,
            rel.to_column,
            rel.cardinality.label(),
            rel.cross_filter.label(),
            if rel.is_active { "" } else { " (inactive)" }
        ));
    }

    for role in &document.roles {
        output.push_str(&format!(
            "role {} ({} filters, {} members)\n",
            role.name,
            role.permissions.len(),
            role.members.len()
        ));
    }

    output
}
