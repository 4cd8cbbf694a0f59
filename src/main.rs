// Entry point and high-level CLI flow.
//
// - Option [1] loads and normalizes the CSV, printing diagnostics.
// - Option [2] runs every report for the configured view, writes the files
//   and prints markdown previews.
// - After generating reports, the user can go back to the menu or exit.
use clap::Parser;
use measles_report::config::{Cli, Settings};
use measles_report::output::preview_table_rows;
use measles_report::reports;
use measles_report::util::{format_int, format_number, format_pct};
use measles_report::Dataset;
use std::io::{self, Write};

/// Read a single line of input after printing the common "Enter choice:" prompt.
///
/// Returns `None` once stdin is closed.
fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Ask whether to go back to the menu after generating reports.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).unwrap_or(0) == 0 {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: load and normalize the CSV file.
fn handle_load(settings: &Settings) -> Option<Dataset> {
    match Dataset::load(&settings.data_path) {
        Ok(ds) => {
            let report = ds.report();
            println!(
                "Processing dataset... ({} rows read, {} country-years kept)",
                format_int(report.total_rows),
                format_int(report.kept_rows)
            );
            println!(
                "Note: {} duplicate rows dropped, {} rows skipped for missing country/year.",
                format_int(report.duplicate_rows),
                format_int(report.invalid_rows)
            );
            if report.unreadable_rows > 0 {
                println!(
                    "Warning: {} rows could not be read and were skipped.",
                    format_int(report.unreadable_rows)
                );
            }
            if report.coerced_cells > 0 {
                println!(
                    "Info: {} cells were not numeric and are treated as missing.",
                    format_int(report.coerced_cells)
                );
            }
            if !report.ignored_columns.is_empty() {
                println!("Info: ignored columns: {}", report.ignored_columns.join(", "));
            }
            let options: Vec<String> = ds.available_selectors().iter().map(|s| s.label()).collect();
            println!("Disease options: {}\n", options.join(", "));
            Some(ds)
        }
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
            None
        }
    }
}

/// Handle option [2]: build every report, write the files, preview them.
fn handle_generate_reports(ds: &Dataset, settings: &Settings) {
    println!("Generating reports...");
    let set = reports::generate(ds, settings);
    let rows = settings.preview_rows;
    let (lo, hi) = set.spec.years;
    println!(
        "(Filtered: {}, {}–{}, {} regions)\n",
        set.spec.disease,
        lo,
        hi,
        set.spec.regions.len()
    );

    let kpis = &set.summary.kpis;
    println!("Total (filtered period): {}", format_number(kpis.period_total, 0));
    match kpis.latest_year {
        Some(year) => println!("Total in {}: {}", year, format_number(kpis.latest_total, 0)),
        None => println!("Total in —: —"),
    }
    println!("YoY latest: {}", format_pct(kpis.yoy_latest));
    println!("Countries: {}\n", format_int(kpis.countries));

    println!("Global trend over time");
    preview_table_rows(&set.global_trend, rows);
    println!("Regional trends");
    preview_table_rows(&set.regional_trend, rows);
    println!("Top {} countries", settings.top_n);
    preview_table_rows(&set.ranking, rows);
    match &set.country {
        Some(c) => println!("Country trend: {}", c),
        None => println!("Country trend"),
    }
    preview_table_rows(&set.country_trend, rows);
    println!("{} lab confirmation rate by region and year (%)", settings.heatmap_disease);
    preview_table_rows(&set.confirmation, rows);
    if let Some(year) = set.map_year {
        println!("Cases by country in {}", year);
        preview_table_rows(&set.map, rows);
    }
    println!("Measles vs Rubella");
    preview_table_rows(&set.summary.disease_comparison, rows);

    match reports::write_all(&set, &settings.output_dir) {
        Ok(paths) => {
            for p in paths {
                println!("(exported {})", p.display());
            }
            println!();
        }
        Err(e) => eprintln!("Write error: {}\n", e),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let settings = match Settings::resolve(&cli) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read settings: {}", e);
            std::process::exit(2);
        }
    };

    let mut dataset: Option<Dataset> = None;
    loop {
        println!("Measles & Rubella Reports");
        println!("[1] Load the file ({})", settings.data_path.display());
        println!("[2] Generate Reports\n");
        let Some(choice) = read_choice() else {
            println!("Exiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => {
                if let Some(ds) = handle_load(&settings) {
                    dataset = Some(ds);
                }
            }
            "2" => {
                println!();
                let Some(ds) = dataset.as_ref() else {
                    println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
                    continue;
                };
                handle_generate_reports(ds, &settings);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}
