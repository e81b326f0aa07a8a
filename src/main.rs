// Entry point and interactive menu.
//
// - Option [1] loads a headcount or overtime spreadsheet into the session.
// - Options [2]-[4] run one dashboard against the loaded data, asking for
//   its parameters, and print the tables (optionally exporting them).
// - After a dashboard the user can go back to the menu or exit.
use clap::Parser;
use once_cell::sync::Lazy;
use servidores_report::config::DashboardConfig;
use servidores_report::filter::{default_year_range, distinct_departments, distinct_years};
use servidores_report::format::DecimalPolicy;
use servidores_report::loader::LoadOptions;
use servidores_report::output;
use servidores_report::reports::{
    self, Dashboard, OvertimeParams, RangeParams, ReportContext,
};
use servidores_report::{RecordStore, Result, Session};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

// One session per process; a new upload swaps the dataset in place while
// dashboards keep working on the snapshot they started with.
static SESSION: Lazy<Session> = Lazy::new(Session::new);

const DEFAULT_CONFIG: &str = "dashboard.toml";

/// Quantitativos de servidores e horas extras por secretaria.
#[derive(Parser, Debug)]
#[command(name = "servidores_report")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the dashboard configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Spreadsheet (.xlsx or .csv) to load before showing the menu
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    prompt("Escolha uma opção: ")
}

fn prompt_back_to_menu() -> bool {
    loop {
        let resp = prompt("Voltar ao menu de relatórios (S/N): ").to_uppercase();
        match resp.as_str() {
            "S" => return true,
            "N" => return false,
            _ => println!("Opção inválida. Digite S ou N."),
        }
    }
}

/// Let the user pick departments by number from the sorted list.
fn prompt_departments(store: &RecordStore) -> BTreeSet<String> {
    let options = distinct_departments(store.records());
    println!("Secretarias:");
    for (i, name) in options.iter().enumerate() {
        println!("  [{}] {}", i + 1, name);
    }
    let answer = prompt("Escolha as secretarias (ex: 1,3): ");
    answer
        .split(',')
        .filter_map(|s| s.trim().parse::<usize>().ok())
        .filter_map(|i| i.checked_sub(1).and_then(|i| options.get(i)).cloned())
        .collect()
}

fn prompt_year(label: &str, default: i32) -> i32 {
    let answer = prompt(&format!("{} [{}]: ", label, default));
    if answer.is_empty() {
        return default;
    }
    answer.parse().unwrap_or_else(|_| {
        println!("Ano inválido, usando {}.", default);
        default
    })
}

fn prompt_range(store: &RecordStore) -> Option<RangeParams> {
    let (first, last) = default_year_range(store.records())?;
    let departments = prompt_departments(store);
    let min_year = prompt_year("Ano Inicial", first);
    let max_year = prompt_year("Ano Final", last);
    Some(RangeParams {
        departments,
        min_year,
        max_year,
    })
}

fn current_store() -> Option<Arc<RecordStore>> {
    let store = SESSION.current();
    if store.is_none() {
        println!("Erro: nenhum dado carregado. Carregue um arquivo primeiro (opção 1).\n");
    }
    store
}

fn export_dir(ctx: &ReportContext) -> Result<Option<&Path>> {
    match ctx.config.export_dir.as_deref() {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            Ok(Some(dir))
        }
        None => Ok(None),
    }
}

fn handle_load(ctx: &ReportContext, path: &Path) {
    let opts = LoadOptions {
        kind: None,
        sheet_name: ctx.config.sheet_name.clone(),
    };
    match SESSION.load_path(path, &opts) {
        Ok((store, report)) => {
            println!(
                "Processando base... ({} linhas lidas, {} carregadas, base de {})",
                ctx.formatter.format(report.total_rows as f64),
                ctx.formatter.format(report.loaded_rows as f64),
                store.schema().kind.label()
            );
            println!(
                "Aviso: {} linhas ignoradas por erros de leitura ou validação.",
                ctx.formatter.format(report.parse_errors as f64)
            );
            if report.coerced_hours > 0 {
                println!(
                    "Info: {} valores de horas não numéricos ignorados.",
                    ctx.formatter.format(report.coerced_hours as f64)
                );
            }
            println!();
        }
        Err(e) => {
            eprintln!("Falha ao carregar o arquivo: {}\n", e);
        }
    }
}

fn handle_headcount(ctx: &ReportContext) -> Result<()> {
    let Some(store) = current_store() else { return Ok(()) };
    let Some(params) = prompt_range(&store) else { return Ok(()) };
    let report = match reports::headcount_by_role(&store, &params, ctx)? {
        Dashboard::NeedsSelection(notice) => {
            println!("{}\n", notice);
            return Ok(());
        }
        Dashboard::Ready(r) => r,
    };

    println!("\n{}\n", report.title);
    let totals: Vec<String> = report
        .year_totals
        .iter()
        .map(|(y, t)| format!("{}: {}", y, ctx.formatter.format(*t)))
        .collect();
    println!("Número de Servidores por ano: {}\n", totals.join(" | "));

    let detail = report.detail.to_display();
    let rendered = detail.render(&ctx.formatter, DecimalPolicy::Fixed(0));
    println!("Dados Detalhados dos Cargos\n");
    output::preview_rendered(&detail.headers, &rendered, ctx.config.preview_rows);

    if let Some(dir) = export_dir(ctx)? {
        output::write_rendered_csv(&dir.join("headcount_detail.csv"), &detail.headers, &rendered)?;
        output::write_json(&dir.join("headcount_series.json"), &report.series())?;
        println!("(Tabela completa exportada para {})\n", dir.display());
    }
    Ok(())
}

fn handle_decline(ctx: &ReportContext) -> Result<()> {
    let Some(store) = current_store() else { return Ok(()) };
    let Some(params) = prompt_range(&store) else { return Ok(()) };
    let report = match reports::decline_ranking(&store, &params, ctx)? {
        Dashboard::NeedsSelection(notice) => {
            println!("{}\n", notice);
            return Ok(());
        }
        Dashboard::Ready(r) => r,
    };

    let rendered = report.table.render(&ctx.formatter, DecimalPolicy::Auto);
    println!("\nDados Detalhados dos Cargos ({}-{})\n", params.min_year, params.max_year);
    output::preview_rendered(&report.table.headers, &rendered, ctx.config.preview_rows);
    println!("{}\n", report.title);
    output::preview_table_rows(&report.ranking, ctx.config.top_n);

    if let Some(dir) = export_dir(ctx)? {
        output::write_rendered_csv(&dir.join("decline_detail.csv"), &report.table.headers, &rendered)?;
        output::write_csv(&dir.join("decline_ranking.csv"), &report.ranking)?;
        println!("(Tabela completa exportada para {})\n", dir.display());
    }
    Ok(())
}

fn handle_overtime(ctx: &ReportContext) -> Result<()> {
    let Some(store) = current_store() else { return Ok(()) };
    let years = distinct_years(store.records());
    println!(
        "Anos disponíveis: {}",
        years.iter().map(|y| y.to_string()).collect::<Vec<_>>().join(", ")
    );
    let selected_years: BTreeSet<i32> = prompt("Selecione o(s) Ano(s) (ex: 2022,2023): ")
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    let params = OvertimeParams {
        years: selected_years,
        departments: prompt_departments(&store),
    };

    let report = match reports::overtime_ranking(&store, &params, ctx)? {
        Dashboard::NeedsSelection(notice) => {
            println!("{}\n", notice);
            return Ok(());
        }
        Dashboard::Ready(r) => r,
    };
    if report.skipped_rows > 0 {
        warn!(skipped = report.skipped_rows, "rows without usable hours");
    }

    println!("\n{}\n", report.title);
    for (role, hours) in report.bars() {
        println!(
            "  {:<40} {}",
            role,
            ctx.formatter.format_with(hours, DecimalPolicy::Fixed(ctx.config.hours_decimals))
        );
    }
    println!("\nDetalhamento dos Dados\n");
    output::preview_table_rows(&report.rows, ctx.config.preview_rows);

    if let Some(dir) = export_dir(ctx)? {
        output::write_csv(&dir.join("overtime_ranking.csv"), &report.rows)?;
        output::write_json(&dir.join("overtime_series.json"), &report.top.series())?;
        println!("(Tabela completa exportada para {})\n", dir.display());
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<DashboardConfig> {
    match &cli.config {
        Some(path) => DashboardConfig::from_file(path),
        None if Path::new(DEFAULT_CONFIG).exists() => DashboardConfig::from_file(Path::new(DEFAULT_CONFIG)),
        None => Ok(DashboardConfig::default()),
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let ctx = match load_config(&cli).and_then(ReportContext::new) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Configuração inválida: {}", e);
            std::process::exit(2);
        }
    };

    if let Some(path) = &cli.file {
        handle_load(&ctx, path);
    }

    loop {
        println!("Quantitativos de Servidores por Secretaria");
        println!("[1] Carregar arquivo");
        println!("[2] Servidores por Cargo");
        println!("[3] Cargos com Maior Decréscimo");
        println!("[4] Horas Extras Realizadas\n");
        let outcome = match read_choice().as_str() {
            "1" => {
                let default = cli.file.clone().unwrap_or_else(|| PathBuf::from("base.xlsx"));
                let answer = prompt(&format!("Caminho do arquivo [{}]: ", default.display()));
                let path = if answer.is_empty() { default } else { PathBuf::from(answer) };
                handle_load(&ctx, &path);
                continue;
            }
            "2" => handle_headcount(&ctx),
            "3" => handle_decline(&ctx),
            "4" => handle_overtime(&ctx),
            _ => {
                println!("Opção inválida. Digite 1, 2, 3 ou 4.\n");
                continue;
            }
        };
        if let Err(e) = outcome {
            error!(error = %e, "dashboard failed");
            eprintln!("Erro: {}\n", e);
        }
        if !prompt_back_to_menu() {
            println!("Encerrando o programa.");
            break;
        }
    }
}
