use std::{fs::File, io::Read, path::Path};

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::{middleware::MiddlewareAttributes, routing::MiddlewareBinding};

// MAX configuration file size: 16 MB
const MAX_CONFIG_FILE_SIZE: usize = 16 * 1024 * 1024;
// Read buffer size: 8 KB
const READ_BUFFER_SIZE: usize = 8 * 1024;

macro_rules! define_const {
    ($name: ident, $val: expr, $type: ty) => {
        fn $name() -> $type {
            $val
        }
    };
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub negotiation: NegotiationConfig,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NegotiationConfig {
    /// Languages the application can respond in, preferred first.
    #[serde(default)]
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteConfig {
    pub path: String,
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
    pub host: Option<String>,
    /// Name the controller is registered under in the resolver.
    pub controller: String,
    pub action: String,
    #[serde(default)]
    pub middleware: Vec<MiddlewareConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MiddlewareConfig {
    pub name: String,
    #[serde(default)]
    pub attributes: MiddlewareAttributes,
}

impl From<MiddlewareConfig> for MiddlewareBinding {
    fn from(config: MiddlewareConfig) -> Self {
        MiddlewareBinding::new(config.name).with_attributes(config.attributes)
    }
}

define_const!(default_methods, vec!["GET".to_string()], Vec<String>);

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        tracing::debug!(path = %path.as_ref().display(), "reading config");
        Self::from_slice(&Self::read_file(path)?)
    }

    pub fn from_slice(content: &[u8]) -> anyhow::Result<Self> {
        // read first non-space u8
        let is_json = match content
            .iter()
            .find(|&&b| b != b' ' && b != b'\r' && b != b'\n' && b != b'\t')
        {
            Some(first) => *first == b'{',
            None => false,
        };
        match is_json {
            true => serde_json::from_slice::<Self>(content).map_err(Into::into),
            false => toml::from_str::<Self>(&String::from_utf8_lossy(content)).map_err(Into::into),
        }
    }

    fn read_file(path: impl AsRef<Path>) -> anyhow::Result<Vec<u8>> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) => bail!("Config: error open file: {:?}", e),
        };

        let mut data = Vec::new();
        let mut buffer = vec![0; READ_BUFFER_SIZE];
        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            if data.len() + n > MAX_CONFIG_FILE_SIZE {
                bail!("Config: max file size: {}", MAX_CONFIG_FILE_SIZE);
            }
            data.extend_from_slice(&buffer[..n]);
        }
        Ok(data)
    }
}
