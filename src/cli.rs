//! Interface de linha de comando do TooT-P baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, split, extract,
//! summarize) e flags globais (--verbose, --config).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// TooT-P: filtra proteínas pelo TooT-T e classifica os transportadores pelo TooT-SC.
#[derive(Debug, Parser)]
#[command(name = "tootp", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho alternativo para o arquivo de configuração.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa o pipeline TooT-T → TooT-SC sobre um arquivo FASTA.
    Run(RunArgs),

    /// Divide um arquivo FASTA em vários arquivos menores.
    Split {
        /// Arquivo FASTA a ser dividido.
        fasta: PathBuf,

        /// Número máximo de pedaços.
        #[arg(long, short, default_value_t = 100)]
        size: usize,

        /// Diretório (vazio) onde os pedaços serão gravados.
        #[arg(long, short, default_value = "out")]
        out: PathBuf,
    },

    /// Extrai de um FASTA os registros listados.
    Extract {
        /// Arquivo FASTA de origem.
        #[arg(long)]
        fasta: PathBuf,

        /// Lista de identificadores, um por linha.
        #[arg(long, required_unless_present = "results", conflicts_with = "results")]
        ids: Option<PathBuf>,

        /// Tabela de resultados consolidada; usa a coluna `ID`.
        #[arg(long)]
        results: Option<PathBuf>,

        /// Arquivo FASTA de saída.
        #[arg(long)]
        out: PathBuf,
    },

    /// Recalcula a tabela de resumo a partir de uma tabela de resultados existente.
    Summarize {
        /// Tabela de resultados consolidada.
        #[arg(long)]
        results: PathBuf,

        /// Arquivo de resumo; padrão: `TooTSCSummary.csv` ao lado dos resultados.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Argumentos do subcomando `run`. Os opcionais caem para `tootp.toml`.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Arquivo FASTA com as sequências a classificar.
    #[arg(long)]
    pub query: PathBuf,

    /// Raiz de trabalho para arquivos intermediários.
    #[arg(long)]
    pub work: Option<PathBuf>,

    /// Diretório de saída para as tabelas finais.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Diretório das bases TCDB e Swissprot.
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Executável do TooT-T.
    #[arg(long = "toot-t")]
    pub toot_t: Option<String>,

    /// Executável do TooT-SC.
    #[arg(long = "toot-sc")]
    pub toot_sc: Option<String>,

    /// Mantém os workspaces de registros bem-sucedidos.
    #[arg(long, default_value_t = false)]
    pub keep_workspaces: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_run_subcommand() {
        let cli = Cli::parse_from([
            "tootp",
            "run",
            "--query",
            "proteome.fasta",
            "--db",
            "/srv/db",
            "--toot-t",
            "/opt/TooT-T.R",
        ]);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.query, PathBuf::from("proteome.fasta"));
                assert_eq!(args.db, Some(PathBuf::from("/srv/db")));
                assert_eq!(args.toot_t.as_deref(), Some("/opt/TooT-T.R"));
                assert!(args.work.is_none());
                assert!(!args.keep_workspaces);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "tootp",
            "--verbose",
            "--config",
            "alt.toml",
            "summarize",
            "--results",
            "TooTSCOut.csv",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
    }

    #[test]
    fn cli_parses_split_defaults() {
        let cli = Cli::parse_from(["tootp", "split", "big.fasta"]);
        match cli.command {
            Command::Split { fasta, size, out } => {
                assert_eq!(fasta, PathBuf::from("big.fasta"));
                assert_eq!(size, 100);
                assert_eq!(out, PathBuf::from("out"));
            }
            _ => panic!("expected Split command"),
        }
    }

    #[test]
    fn extract_requires_exactly_one_id_source() {
        assert!(
            Cli::try_parse_from(["tootp", "extract", "--fasta", "a.fa", "--out", "b.fa"]).is_err()
        );
        assert!(
            Cli::try_parse_from([
                "tootp", "extract", "--fasta", "a.fa", "--out", "b.fa", "--ids", "i.txt",
                "--results", "r.csv",
            ])
            .is_err()
        );
        assert!(
            Cli::try_parse_from([
                "tootp", "extract", "--fasta", "a.fa", "--out", "b.fa", "--ids", "i.txt",
            ])
            .is_ok()
        );
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
