//! Interface de terminal: spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`ExportProgress`] acompanha visualmente
//! o polling de uma exportação no terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::export::{ExportOutcome, ExportRecord};
use crate::reports::ReportRecord;

/// Indicador visual de progresso para o polling de uma exportação.
///
/// Exibe um spinner animado enquanto o job está pendente e mensagens
/// coloridas para sucesso (verde), falha (vermelho) e timeout (amarelo).
pub struct ExportProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl ExportProgress {
    /// Inicia o spinner com o identificador do job.
    pub fn start(job_id: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Polling export {job_id}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Atualiza a mensagem com a verificação atual.
    pub fn attempt(&self, job_id: &str, attempt: u32, max: u32) {
        self.pb
            .set_message(format!("Polling export {job_id} (check {attempt}/{max})"));
    }

    /// Finaliza o spinner e exibe o resultado final.
    pub fn complete(&self, outcome: &ExportOutcome) {
        self.pb.finish_and_clear();
        match outcome {
            ExportOutcome::Success { artifact_url } => {
                eprintln!("  {} Export ready: {artifact_url}", self.green.apply_to("✓"));
            }
            ExportOutcome::Failure { reason } => {
                eprintln!("  {} Export failed: {reason}", self.red.apply_to("✗"));
            }
            ExportOutcome::TimedOut => {
                eprintln!("  {} Export timed out", self.yellow.apply_to("⧗"));
            }
        }
    }

    /// Imprime o registro da exportação em JSON com estilo colorido.
    pub fn print_record(&self, record: &ExportRecord) {
        let style = match record.outcome {
            ExportOutcome::Success { .. } => &self.green,
            ExportOutcome::Failure { .. } => &self.red,
            ExportOutcome::TimedOut => &self.yellow,
        };
        eprintln!();
        eprintln!("{}", style.apply_to("─── Export Record ───"));
        eprintln!("{}", serde_json::to_string_pretty(record).unwrap_or_default());
    }
}

/// Linhas numeradas para exibição; `limit` 0 mostra todas.
pub fn preview_lines(records: &[ReportRecord], limit: usize) -> Vec<String> {
    let take = if limit == 0 { records.len() } else { limit };
    records
        .iter()
        .take(take)
        .enumerate()
        .map(|(i, row)| {
            format!(
                "{}. {}",
                i + 1,
                serde_json::to_string(row).unwrap_or_default()
            )
        })
        .collect()
}

/// Imprime um resumo do relatório lido.
pub fn print_preview(report_url: &str, records: &[ReportRecord], limit: usize) {
    let dim = Style::new().dim();
    eprintln!("Report url: {report_url}");
    eprintln!("Report total row count: {}", records.len());
    if records.is_empty() {
        return;
    }
    eprintln!("{}", dim.apply_to("------------------"));
    for line in preview_lines(records, limit) {
        eprintln!("{line}");
    }
    eprintln!("{}", dim.apply_to("------------------"));
}
