use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{CoreError, CoreResult};

/// A parsed Maven coordinate, as found in loader profile `libraries[].name`.
///
/// Accepted forms: `group:artifact:version`, `group:artifact:version:classifier`,
/// each optionally suffixed with `@extension`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MavenArtifact {
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub classifier: Option<String>,
    /// Defaults to `jar`.
    pub extension: String,
}

impl MavenArtifact {
    pub fn parse(coord: &str) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidMavenCoordinate(coord.to_string());

        let (body, extension) = match coord.rsplit_once('@') {
            Some((body, ext)) if !ext.is_empty() => (body, ext),
            Some(_) => return Err(invalid()),
            None => (coord, "jar"),
        };

        let parts: Vec<&str> = body.split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }

        let (group, artifact, version, classifier) = match parts.as_slice() {
            [g, a, v] => (*g, *a, *v, None),
            [g, a, v, c] => (*g, *a, *v, Some((*c).to_string())),
            _ => return Err(invalid()),
        };

        Ok(Self {
            group: group.to_string(),
            artifact: artifact.to_string(),
            version: version.to_string(),
            classifier,
            extension: extension.to_string(),
        })
    }

    /// `artifact-version[-classifier].extension`
    pub fn filename(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}-{}-{}.{}", self.artifact, self.version, c, self.extension),
            None => format!("{}-{}.{}", self.artifact, self.version, self.extension),
        }
    }

    /// Repository-relative path with forward slashes, shared by
    /// [`url`](Self::url) and [`local_path`](Self::local_path).
    pub fn relative_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group.replace('.', "/"),
            self.artifact,
            self.version,
            self.filename()
        )
    }

    pub fn url(&self, repo_base: &str) -> String {
        format!("{}/{}", repo_base.trim_end_matches('/'), self.relative_path())
    }

    /// Path relative to the `libraries/` directory.
    pub fn local_path(&self) -> PathBuf {
        self.relative_path().split('/').collect()
    }
}

impl FromStr for MavenArtifact {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MavenArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)?;
        if let Some(c) = &self.classifier {
            write!(f, ":{c}")?;
        }
        if self.extension != "jar" {
            write!(f, "@{}", self.extension)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_coordinate() {
        let a = MavenArtifact::parse("net.fabricmc:fabric-loader:0.15.0").unwrap();
        assert_eq!(a.group, "net.fabricmc");
        assert_eq!(a.artifact, "fabric-loader");
        assert_eq!(a.version, "0.15.0");
        assert_eq!(a.classifier, None);
        assert_eq!(a.extension, "jar");
    }

    #[test]
    fn parse_classifier_and_extension() {
        let a: MavenArtifact = "org.lwjgl:lwjgl:3.3.3:natives-windows@zip".parse().unwrap();
        assert_eq!(a.classifier.as_deref(), Some("natives-windows"));
        assert_eq!(a.extension, "zip");
        assert_eq!(a.to_string(), "org.lwjgl:lwjgl:3.3.3:natives-windows@zip");
    }

    #[test]
    fn rejects_malformed_coordinates() {
        for bad in ["a:b", "a::1", "a:b:c:d:e", "a:b:1@"] {
            assert!(
                matches!(MavenArtifact::parse(bad), Err(CoreError::InvalidMavenCoordinate(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn url_and_local_path_share_layout() {
        let a = MavenArtifact::parse("org.ow2.asm:asm:9.6").unwrap();
        assert_eq!(
            a.url("https://maven.fabricmc.net/"),
            "https://maven.fabricmc.net/org/ow2/asm/asm/9.6/asm-9.6.jar"
        );
        assert_eq!(
            a.local_path(),
            PathBuf::from("org").join("ow2").join("asm").join("asm").join("9.6").join("asm-9.6.jar")
        );
    }
}
