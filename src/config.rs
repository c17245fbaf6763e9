//! Configuração do TooT-P carregada a partir de `tootp.toml`.
//!
//! A struct [`TootConfig`] contém os parâmetros configuráveis de uma execução.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `TOOTP_DB`, `TOOTP_TOOT_T` e `TOOTP_TOOT_SC`
//! têm precedência sobre o arquivo; flags da CLI têm precedência sobre tudo.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use crate::cli::RunArgs;

/// Nome do arquivo de configuração procurado no diretório atual.
pub const CONFIG_FILE: &str = "tootp.toml";

/// Configuração de nível superior carregada de `tootp.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct TootConfig {
    /// Raiz de trabalho para arquivos intermediários (passada às ferramentas como `-work`).
    #[serde(default = "default_work")]
    pub work: PathBuf,

    /// Diretório onde as tabelas finais são gravadas.
    #[serde(default = "default_out")]
    pub out: PathBuf,

    /// Diretório com as bases TCDB e Swissprot.
    #[serde(default = "default_db")]
    pub db: PathBuf,

    /// Executável do TooT-T (nome procurado no PATH ou caminho).
    #[serde(default = "default_toot_t")]
    pub toot_t: String,

    /// Executável do TooT-SC (nome procurado no PATH ou caminho).
    #[serde(default = "default_toot_sc")]
    pub toot_sc: String,

    /// Mantém os workspaces de registros bem-sucedidos em disco.
    #[serde(default)]
    pub keep_workspaces: bool,
}

// Valor padrão para a raiz de trabalho: diretório atual.
fn default_work() -> PathBuf {
    PathBuf::from(".")
}

// Valor padrão para a saída: diretório atual.
fn default_out() -> PathBuf {
    PathBuf::from(".")
}

// Valor padrão para as bases: ./db.
fn default_db() -> PathBuf {
    PathBuf::from("db")
}

fn default_toot_t() -> String {
    "TooT-T.R".to_string()
}

fn default_toot_sc() -> String {
    "TooT-SC.R".to_string()
}

impl Default for TootConfig {
    fn default() -> Self {
        Self {
            work: default_work(),
            out: default_out(),
            db: default_db(),
            toot_t: default_toot_t(),
            toot_sc: default_toot_sc(),
            keep_workspaces: false,
        }
    }
}

impl TootConfig {
    /// Carrega a configuração de `tootp.toml` (ou do caminho dado).
    /// Usa valores padrão se o arquivo não existir.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or(Path::new(CONFIG_FILE));
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<TootConfig>(&contents)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Aplica as variáveis de ambiente não vazias sobre os valores do arquivo.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(db) = get("TOOTP_DB") {
            self.db = PathBuf::from(db);
        }
        if let Some(exe) = get("TOOTP_TOOT_T") {
            self.toot_t = exe;
        }
        if let Some(exe) = get("TOOTP_TOOT_SC") {
            self.toot_sc = exe;
        }
    }
}

/// Parâmetros efetivos de uma execução do pipeline, depois de combinar CLI e arquivo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub query: PathBuf,
    pub work: PathBuf,
    pub out: PathBuf,
    pub db: PathBuf,
    pub toot_t: PathBuf,
    pub toot_sc: PathBuf,
    pub keep_workspaces: bool,
}

impl RunSettings {
    /// Flags da CLI vencem; o restante vem da configuração.
    pub fn resolve(args: &RunArgs, config: &TootConfig) -> Self {
        Self {
            query: args.query.clone(),
            work: args.work.clone().unwrap_or_else(|| config.work.clone()),
            out: args.out.clone().unwrap_or_else(|| config.out.clone()),
            db: args.db.clone().unwrap_or_else(|| config.db.clone()),
            toot_t: PathBuf::from(args.toot_t.as_deref().unwrap_or(&config.toot_t)),
            toot_sc: PathBuf::from(args.toot_sc.as_deref().unwrap_or(&config.toot_sc)),
            keep_workspaces: args.keep_workspaces || config.keep_workspaces,
        }
    }
}
