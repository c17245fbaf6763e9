//! Interface de terminal do TooT-P: barra de progresso e saída colorida.
//!
//! Usa as crates `indicatif` para a barra de progresso e `console` para
//! estilização com cores. O [`RunProgress`] acompanha visualmente
//! o andamento do lote no terminal, uma linha por registro.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::aggregate::AggregateState;
use crate::error::StageFailure;
use crate::state_machine::RunReport;

/// Indicador visual de progresso para uma execução do pipeline.
///
/// Exibe uma barra com o número de registros processados e mensagens
/// coloridas para classificação (verde), rejeição (amarelo) e falha (vermelho).
pub struct RunProgress {
    // Barra de progresso do indicatif.
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl RunProgress {
    /// Inicia a barra; o total é definido quando o lote termina de ser lido.
    pub fn start() -> Self {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .expect("invalid template")
                .progress_chars("=> "),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self::with_bar(pb)
    }

    /// Versão sem saída, usada nos testes.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(pb: ProgressBar) -> Self {
        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }

    /// Define o número de registros do lote.
    pub fn set_total(&self, total: usize) {
        self.pb.set_length(total as u64);
    }

    /// Atualiza a mensagem com o registro e a etapa em andamento.
    pub fn stage(&self, record_id: &str, tool: &str) {
        self.pb.set_message(format!("{record_id}: {tool}"));
    }

    pub fn classified(&self, record_id: &str, label: &str) {
        self.pb.println(format!(
            "  {} {record_id} → {label}",
            self.green.apply_to("✓")
        ));
        self.pb.inc(1);
    }

    pub fn rejected(&self, record_id: &str) {
        self.pb.println(format!(
            "  {} {record_id} {}",
            self.yellow.apply_to("·"),
            self.dim.apply_to("not a transporter")
        ));
        self.pb.inc(1);
    }

    pub fn failed(&self, failure: &StageFailure) {
        self.pb.println(format!(
            "  {} Problem with sequence: {} ({}: {})",
            self.red.apply_to("✗"),
            failure.record_id,
            failure.stage,
            failure.kind
        ));
        self.pb.inc(1);
    }

    /// Finaliza a barra e imprime a tabela de resumo por classe.
    pub fn complete(&self, report: &RunReport, state: &AggregateState) {
        self.pb.finish_and_clear();
        let headline = if report.cancelled {
            self.yellow.apply_to("─── Run cancelled ───")
        } else {
            self.green.apply_to("─── Run complete ───")
        };
        println!();
        println!("{headline}");
        print_summary(state);
        println!(
            "  {} classified, {} rejected, {} TooT-T failures, {} TooT-SC failures ({} ms)",
            report.classified,
            report.rejected,
            report.stage1_failed,
            report.stage2_failed,
            report.duration_ms
        );
    }
}

/// Imprime a tabela de resumo, destacando as classes com ocorrências.
pub fn print_summary(state: &AggregateState) {
    let bold = Style::new().bold();
    let dim = Style::new().dim();
    for (label, count) in state.summary_rows() {
        let line = format!("  {label:<32} {count:>6}");
        if count > 0 {
            println!("{}", bold.apply_to(line));
        } else {
            println!("{}", dim.apply_to(line));
        }
    }
    println!("  {:<32} {:>6}", "total", state.canonical_total());
}
