use std::env;
use std::fmt;

use crate::error::{RenewError, Result};
use crate::ids::VpsId;

pub const VPS_ID_VAR: &str = "VPS_ID";
pub const SESSION_ID_VAR: &str = "X2SESSID";
pub const DEVICE_KEY_VAR: &str = "XSERVER_DEVICEKEY";

/// Everything the renewal CLI needs from the environment.
#[derive(Clone)]
pub struct RenewConfig {
    pub vps_id: VpsId,
    pub session_id: String,
    pub device_key: String,
}

impl RenewConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the config from any variable source. Unset and empty values are
    /// both treated as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let vps_id = read(VPS_ID_VAR);
        let session_id = read(SESSION_ID_VAR);
        let device_key = read(DEVICE_KEY_VAR);

        match (vps_id, session_id, device_key) {
            (Some(vps_id), Some(session_id), Some(device_key)) => Ok(Self {
                vps_id: VpsId::new(vps_id),
                session_id,
                device_key,
            }),
            (vps_id, session_id, device_key) => {
                let missing: Vec<&str> = [
                    (VPS_ID_VAR, vps_id.is_none()),
                    (SESSION_ID_VAR, session_id.is_none()),
                    (DEVICE_KEY_VAR, device_key.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, missing)| missing.then_some(name))
                .collect();

                Err(RenewError::Config(format!(
                    "missing required environment variables: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

// Never print the raw credentials.
impl fmt::Debug for RenewConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenewConfig")
            .field("vps_id", &self.vps_id)
            .field("session_id", &mask_credential(&self.session_id))
            .field("device_key", &mask_credential(&self.device_key))
            .finish()
    }
}

/// Mask a credential for logging: `****` for up to four characters,
/// otherwise the first and last two characters around `****`.
pub fn mask_credential(credential: &str) -> String {
    let chars: Vec<char> = credential.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}****{tail}")
}
