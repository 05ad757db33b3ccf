//! OS-family specific inspection commands.

use std::{borrow::Cow, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use shell_escape::unix::escape;

use crate::core::inspect::InspectionResult;

/// Command whose output identifies the distribution on every family.
pub const OS_RELEASE_COMMAND: &str = "cat /etc/os-release";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    /// Read `/etc/os-release` inside the instance.
    #[default]
    Auto,
    Debian,
    #[serde(alias = "rhel")]
    RedHat,
    Alpine,
}

impl OsFamily {
    /// Inspector for a concrete family; `None` for [`OsFamily::Auto`].
    pub fn inspector(self) -> Option<&'static dyn OsInspector> {
        match self {
            Self::Auto => None,
            Self::Debian => Some(&Debian),
            Self::RedHat => Some(&RedHat),
            Self::Alpine => Some(&Alpine),
        }
    }

    /// Pick a family from the contents of `/etc/os-release`.
    ///
    /// `ID` wins over `ID_LIKE`; the first recognised `ID_LIKE` entry is used.
    pub fn detect(os_release: &str) -> Option<Self> {
        let mut id = None;
        let mut id_like = None;
        for line in os_release.lines() {
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().trim_matches(|c: char| c == '"' || c == '\'');
                match key.trim() {
                    "ID" => id = Some(value.to_ascii_lowercase()),
                    "ID_LIKE" => id_like = Some(value.to_ascii_lowercase()),
                    _ => {}
                }
            }
        }

        id.as_deref()
            .and_then(Self::from_distribution)
            .or_else(|| {
                id_like
                    .as_deref()?
                    .split_whitespace()
                    .find_map(Self::from_distribution)
            })
    }

    fn from_distribution(id: &str) -> Option<Self> {
        match id {
            "debian" | "ubuntu" | "linuxmint" | "raspbian" | "kali" | "pop" => Some(Self::Debian),
            "rhel" | "centos" | "fedora" | "rocky" | "almalinux" | "amzn" | "ol" => {
                Some(Self::RedHat)
            }
            "alpine" => Some(Self::Alpine),
            _ => None,
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Debian => "debian",
            Self::RedHat => "redhat",
            Self::Alpine => "alpine",
        })
    }
}

impl FromStr for OsFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "debian" => Ok(Self::Debian),
            "redhat" | "rhel" => Ok(Self::RedHat),
            "alpine" => Ok(Self::Alpine),
            other => Err(format!(
                "unknown OS family {other:?} (expected auto, debian, redhat or alpine)"
            )),
        }
    }
}

/// Capability interface over OS-specific inspection commands.
pub trait OsInspector: Send + Sync {
    fn family(&self) -> OsFamily;

    /// Command printing the distribution name and release.
    fn os_version_command(&self) -> String;

    /// Command querying whether `package` is installed.
    fn package_query_command(&self, package: &str) -> String;

    /// Interpret the result of [`Self::package_query_command`].
    fn package_installed(&self, package: &str, result: &InspectionResult) -> bool;
}

fn quoted(package: &str) -> Cow<'_, str> {
    escape(Cow::Borrowed(package))
}

pub struct Debian;

impl OsInspector for Debian {
    fn family(&self) -> OsFamily {
        OsFamily::Debian
    }

    fn os_version_command(&self) -> String {
        "lsb_release -a".to_string()
    }

    fn package_query_command(&self, package: &str) -> String {
        format!(
            "dpkg-query -f '${{Status}} ${{Version}}\\n' -W {}",
            quoted(package)
        )
    }

    fn package_installed(&self, _package: &str, result: &InspectionResult) -> bool {
        result.success()
            && result.stdout_lines().any(|line| {
                line.starts_with("install ok installed") || line.starts_with("hold ok installed")
            })
    }
}

pub struct RedHat;

impl OsInspector for RedHat {
    fn family(&self) -> OsFamily {
        OsFamily::RedHat
    }

    fn os_version_command(&self) -> String {
        "cat /etc/redhat-release /etc/os-release".to_string()
    }

    fn package_query_command(&self, package: &str) -> String {
        format!("rpm -q {}", quoted(package))
    }

    fn package_installed(&self, _package: &str, result: &InspectionResult) -> bool {
        result.success()
    }
}

pub struct Alpine;

impl OsInspector for Alpine {
    fn family(&self) -> OsFamily {
        OsFamily::Alpine
    }

    fn os_version_command(&self) -> String {
        "cat /etc/alpine-release /etc/os-release".to_string()
    }

    fn package_query_command(&self, package: &str) -> String {
        format!("apk info -e {}", quoted(package))
    }

    fn package_installed(&self, package: &str, result: &InspectionResult) -> bool {
        result.success() && result.stdout_lines().any(|line| line.trim() == package)
    }
}
