//! Configuração do cliente carregada a partir de `tune_reporting.toml`.
//!
//! A struct [`ReportingConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `TUNE_REPORTING_API_KEY` tem precedência sobre o arquivo.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::SdkError;
use crate::export::PollConfig;
use crate::management::{API_URL_BASE, API_VERSION, ManagementClient};

pub const CONFIG_FILE: &str = "tune_reporting.toml";
pub const API_KEY_ENV: &str = "TUNE_REPORTING_API_KEY";

/// Configuração de nível superior carregada de `tune_reporting.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    /// Chave da Management API.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_api_url_base")]
    pub api_url_base: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Intervalo entre verificações de status, em segundos.
    #[serde(default = "default_status_sleep_seconds")]
    pub status_sleep_seconds: u64,

    /// Máximo de verificações de status antes de desistir do job.
    #[serde(default = "default_status_max_attempts")]
    pub status_max_attempts: u32,

    /// Tempo máximo que o chamador espera pelo resultado; 0 espera sem limite.
    #[serde(default)]
    pub status_timeout_seconds: u64,

    /// Timeout de cada requisição HTTP.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_api_url_base() -> String {
    API_URL_BASE.to_string()
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

// Valor padrão para o intervalo de verificação: 10s.
fn default_status_sleep_seconds() -> u64 {
    10
}

// Valor padrão para verificações máximas: 60.
fn default_status_max_attempts() -> u32 {
    60
}

fn default_request_timeout_seconds() -> u64 {
    60
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url_base: default_api_url_base(),
            api_version: default_api_version(),
            status_sleep_seconds: default_status_sleep_seconds(),
            status_max_attempts: default_status_max_attempts(),
            status_timeout_seconds: 0,
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl ReportingConfig {
    /// Carrega a configuração do caminho informado ou de `tune_reporting.toml`
    /// no diretório atual. Sem caminho explícito, um arquivo ausente usa os defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, SdkError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };

        // Variável de ambiente tem precedência sobre o arquivo de configuração para a chave API.
        Ok(config.with_env_api_key(std::env::var(API_KEY_ENV).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self, SdkError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str::<ReportingConfig>(&contents)?)
    }

    /// Substitui a chave API quando o valor do ambiente não está vazio.
    pub fn with_env_api_key(mut self, key: Option<String>) -> Self {
        if let Some(key) = key
            && !key.trim().is_empty()
        {
            self.api_key = key.trim().to_string();
        }
        self
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(
            Duration::from_secs(self.status_sleep_seconds),
            self.status_max_attempts,
        )
    }

    /// `None` quando `status_timeout_seconds` é 0.
    pub fn caller_timeout(&self) -> Option<Duration> {
        (self.status_timeout_seconds > 0).then(|| Duration::from_secs(self.status_timeout_seconds))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Cria o cliente HTTP; falha se a chave API estiver vazia.
    pub fn client(&self) -> Result<ManagementClient, SdkError> {
        if self.api_key.trim().is_empty() {
            return Err(SdkError::Config(format!(
                "api_key is not set; add it to {CONFIG_FILE} or export {API_KEY_ENV}"
            )));
        }
        Ok(ManagementClient::with_timeout(
            self.api_key.clone(),
            self.api_url_base.clone(),
            self.api_version.clone(),
            self.request_timeout(),
        )?)
    }
}
