// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use callscope_app::SessionContext;
use serde::Deserialize;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
struct StoredSession {
    token: Option<String>,
    role: Option<String>,
}

/// Session credentials kept in a small TOML file written by the sign-in
/// flow. `CALLSCOPE_TOKEN` and `CALLSCOPE_ROLE` take precedence.
#[derive(Debug, Clone)]
pub struct FileSession {
    path: PathBuf,
    stored: StoredSession,
    env_token: Option<String>,
    env_role: Option<String>,
}

impl FileSession {
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_env(
            path,
            env::var("CALLSCOPE_TOKEN").ok(),
            env::var("CALLSCOPE_ROLE").ok(),
        )
    }

    pub fn load_with_env(
        path: &Path,
        env_token: Option<String>,
        env_role: Option<String>,
    ) -> Result<Self> {
        let stored = match fs::read_to_string(path) {
            Ok(raw) => toml::from_str(&raw)
                .with_context(|| format!("parse session file {}", path.display()))?,
            Err(error) if error.kind() == ErrorKind::NotFound => StoredSession::default(),
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("read session file {}", path.display()));
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            stored,
            env_token: non_blank(env_token),
            env_role: non_blank(env_role),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionContext for FileSession {
    fn token(&self) -> Option<String> {
        self.env_token
            .clone()
            .or_else(|| non_blank(self.stored.token.clone()))
    }

    fn role(&self) -> Option<String> {
        self.env_role
            .clone()
            .or_else(|| non_blank(self.stored.role.clone()))
    }

    fn clear(&mut self) -> Result<()> {
        self.stored = StoredSession::default();
        self.env_token = None;
        self.env_role = None;
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("removed session file {}", self.path.display());
                Ok(())
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error)
                .with_context(|| format!("remove session file {}", self.path.display())),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
