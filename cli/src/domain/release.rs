//! Supported Ubuntu releases and their cloud image locations.

use std::fmt;

/// Supported Ubuntu cloud image releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Release {
    /// 22.04 LTS
    Jammy,
    /// 20.04 LTS
    Focal,
    /// 24.04 LTS
    Noble,
}

struct ReleaseInfo {
    codename: &'static str,
    version: &'static str,
}

impl Release {
    /// All supported releases.
    pub const ALL: [Release; 3] = [Release::Jammy, Release::Focal, Release::Noble];

    const fn info(self) -> ReleaseInfo {
        match self {
            Release::Jammy => ReleaseInfo { codename: "jammy", version: "22.04" },
            Release::Focal => ReleaseInfo { codename: "focal", version: "20.04" },
            Release::Noble => ReleaseInfo { codename: "noble", version: "24.04" },
        }
    }

    /// Codename used as the download path segment, e.g. `"jammy"`.
    #[must_use]
    pub fn codename(self) -> &'static str {
        self.info().codename
    }

    /// Ubuntu version number, e.g. `"22.04"`.
    #[must_use]
    pub fn version(self) -> &'static str {
        self.info().version
    }

    /// Cloud image file name, e.g. `jammy-server-cloudimg-amd64.img`.
    #[must_use]
    pub fn image_filename(self) -> String {
        format!("{}-server-cloudimg-amd64.img", self.codename())
    }

    /// Download URL under `base_url`.
    #[must_use]
    pub fn image_url(self, base_url: &str) -> String {
        format!(
            "{}/{}/current/{}",
            base_url.trim_end_matches('/'),
            self.codename(),
            self.image_filename()
        )
    }

    /// Default template name for this release.
    #[must_use]
    pub fn default_template_name(self) -> String {
        format!("ubuntu-{}-template", self.codename())
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codename())
    }
}
