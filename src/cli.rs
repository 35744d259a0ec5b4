//! Interface de linha de comando baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (export, status, fetch)
//! e flags globais (--config, --sleep, --max-attempts, --timeout, --verbose).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::ReportingConfig;
use crate::management::{ExportParams, ReportFormat, ReportKind};

/// Exporta relatórios da Management API e acompanha o job até o fim.
#[derive(Debug, Parser)]
#[command(name = "tune-reporting", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./tune_reporting.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Segundos entre verificações de status.
    #[arg(long, global = true)]
    pub sleep: Option<u64>,

    /// Número máximo de verificações de status.
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Segundos que o comando espera pelo resultado (0 = sem limite).
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Flags da CLI têm precedência sobre arquivo e ambiente.
    pub fn apply_overrides(&self, config: &mut ReportingConfig) {
        if let Some(sleep) = self.sleep {
            config.status_sleep_seconds = sleep;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.status_max_attempts = max_attempts;
        }
        if let Some(timeout) = self.timeout {
            config.status_timeout_seconds = timeout;
        }
    }
}

/// Relatório aceito pela CLI, mapeado para [`ReportKind`] internamente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportArg {
    Clicks,
    EventItems,
    Events,
    Installs,
    Postbacks,
    Updates,
    Actuals,
    Cohort,
    Retention,
}

impl From<ReportArg> for ReportKind {
    fn from(arg: ReportArg) -> Self {
        match arg {
            ReportArg::Clicks => ReportKind::Clicks,
            ReportArg::EventItems => ReportKind::EventItems,
            ReportArg::Events => ReportKind::Events,
            ReportArg::Installs => ReportKind::Installs,
            ReportArg::Postbacks => ReportKind::Postbacks,
            ReportArg::Updates => ReportKind::Updates,
            ReportArg::Actuals => ReportKind::Actuals,
            ReportArg::Cohort => ReportKind::Cohort,
            ReportArg::Retention => ReportKind::Retention,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    #[default]
    Csv,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ReportFormat::Csv,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

/// Onde e como o artefato baixado é entregue.
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Salva o artefato bruto neste arquivo em vez de imprimir registros.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Mostra um resumo numerado das primeiras N linhas em vez de JSON lines.
    #[arg(long)]
    pub summary: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submete uma exportação, acompanha o job e lê o relatório.
    Export {
        #[arg(value_enum)]
        report: ReportArg,

        /// Início do período (YYYY-MM-DD ou "YYYY-MM-DD HH:MM:SS").
        #[arg(long)]
        start: String,

        /// Fim do período.
        #[arg(long)]
        end: String,

        /// Campos do relatório, separados por vírgula.
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        /// Campos de agrupamento, separados por vírgula.
        #[arg(long, value_delimiter = ',')]
        group: Vec<String>,

        /// Expressão de filtro, por exemplo "publisher_id > 0".
        #[arg(long)]
        filter: Option<String>,

        #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
        format: FormatArg,

        /// Fuso horário das datas no relatório.
        #[arg(long)]
        timezone: Option<String>,

        /// Parâmetro extra `nome=valor`; pode repetir.
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Verifica uma única vez o status de um job.
    Status {
        #[arg(value_enum)]
        report: ReportArg,

        job_id: String,
    },

    /// Acompanha um job já submetido e lê o relatório.
    Fetch {
        #[arg(value_enum)]
        report: ReportArg,

        job_id: String,

        #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
        format: FormatArg,

        #[command(flatten)]
        output: OutputArgs,
    },
}

impl Command {
    /// Monta os parâmetros de exportação; `None` para outros subcomandos.
    pub fn export_params(&self) -> Option<ExportParams> {
        let Command::Export {
            start,
            end,
            fields,
            group,
            filter,
            format,
            timezone,
            params,
            ..
        } = self
        else {
            return None;
        };

        Some(ExportParams {
            start_date: start.clone(),
            end_date: end.clone(),
            fields: fields.clone(),
            group: group.clone(),
            filter: filter.clone(),
            format: (*format).into(),
            response_timezone: timezone.clone(),
            extra: params.clone(),
        })
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected name=value, got '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_export_subcommand() {
        let cli = Cli::parse_from([
            "tune-reporting",
            "export",
            "cohort",
            "--start",
            "2024-01-01",
            "--end",
            "2024-01-07",
            "--fields",
            "site_id,publisher_id",
            "--param",
            "cohort_type=click",
            "--param",
            "interval=year_day",
            "--format",
            "json",
        ]);
        let params = cli.command.export_params().unwrap();
        assert_eq!(params.start_date, "2024-01-01");
        assert_eq!(params.fields, vec!["site_id", "publisher_id"]);
        assert_eq!(params.format, ReportFormat::Json);
        assert_eq!(
            params.extra,
            vec![
                ("cohort_type".to_string(), "click".to_string()),
                ("interval".to_string(), "year_day".to_string())
            ]
        );
        match cli.command {
            Command::Export { report, output, .. } => {
                assert_eq!(ReportKind::from(report), ReportKind::Cohort);
                assert!(output.output.is_none());
            }
            _ => panic!("expected Export command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "tune-reporting",
            "--sleep",
            "2",
            "--max-attempts",
            "5",
            "--timeout",
            "30",
            "--verbose",
            "status",
            "event-items",
            "job-1",
        ]);
        assert!(cli.verbose);
        match &cli.command {
            Command::Status { report, job_id } => {
                assert_eq!(*report, ReportArg::EventItems);
                assert_eq!(job_id, "job-1");
            }
            _ => panic!("expected Status command"),
        }

        let mut config = ReportingConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.status_sleep_seconds, 2);
        assert_eq!(config.status_max_attempts, 5);
        assert_eq!(config.status_timeout_seconds, 30);
    }

    #[test]
    fn cli_parses_fetch_with_output() {
        let cli = Cli::parse_from([
            "tune-reporting",
            "fetch",
            "installs",
            "job-9",
            "--output",
            "report.csv",
        ]);
        assert!(cli.command.export_params().is_none());
        match cli.command {
            Command::Fetch {
                report,
                job_id,
                format,
                output,
            } => {
                assert_eq!(report, ReportArg::Installs);
                assert_eq!(job_id, "job-9");
                assert_eq!(format, FormatArg::Csv);
                assert_eq!(output.output, Some(PathBuf::from("report.csv")));
            }
            _ => panic!("expected Fetch command"),
        }
    }

    #[test]
    fn key_value_parser() {
        assert_eq!(
            parse_key_value("cohort_type=install").unwrap(),
            ("cohort_type".to_string(), "install".to_string())
        );
        assert!(parse_key_value("no-equals").is_err());
        assert!(parse_key_value("=value").is_err());
    }

    #[test]
    fn every_report_arg_maps_to_a_kind() {
        for arg in ReportArg::value_variants() {
            let kind = ReportKind::from(*arg);
            let name = arg.to_possible_value().unwrap().get_name().replace('-', "_");
            assert_eq!(kind.to_string(), name);
        }
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
