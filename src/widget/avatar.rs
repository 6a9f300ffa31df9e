use serde::Serialize;

pub const DEFAULT_AVATAR_PATH: &str = "/img/five.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailKind {
    Avatar,
    Persona,
}

impl ThumbnailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailKind::Avatar => "avatar",
            ThumbnailKind::Persona => "persona",
        }
    }
}

/// Builds thumbnail URLs through the host's template when it registered one,
/// e.g. `http://127.0.0.1:8000/thumbnail?type={type}&file={file}`.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailUrls {
    template: Option<String>,
}

impl ThumbnailUrls {
    pub fn new(template: Option<String>) -> Self {
        Self {
            template: template.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn has_template(&self) -> bool {
        self.template.is_some()
    }

    pub fn url(&self, kind: ThumbnailKind, file: &str) -> String {
        match &self.template {
            Some(template) => template
                .replace("{type}", kind.as_str())
                .replace("{file}", file),
            None => format!("/thumbnail?type={}&file={}", kind.as_str(), file),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum AvatarSource {
    Override { url: String },
    Thumbnail { url: String, fallback: bool },
    Default,
}

impl AvatarSource {
    pub fn url(&self) -> &str {
        match self {
            AvatarSource::Override { url } | AvatarSource::Thumbnail { url, .. } => url,
            AvatarSource::Default => DEFAULT_AVATAR_PATH,
        }
    }

    /// True when the host lacked a thumbnail resolver and the direct URL was used.
    pub fn used_fallback(&self) -> bool {
        matches!(self, AvatarSource::Thumbnail { fallback: true, .. })
    }
}

/// Override, then host thumbnail, then the bundled default image.
pub fn resolve_avatar(
    override_url: &str,
    host_file: Option<&str>,
    kind: ThumbnailKind,
    thumbnails: &ThumbnailUrls,
) -> AvatarSource {
    let override_url = override_url.trim();
    if !override_url.is_empty() {
        return AvatarSource::Override {
            url: override_url.to_string(),
        };
    }

    match host_file.map(str::trim).filter(|file| !file.is_empty()) {
        Some(file) => AvatarSource::Thumbnail {
            url: thumbnails.url(kind, file),
            fallback: !thumbnails.has_template(),
        },
        None => AvatarSource::Default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_everything() {
        let source = resolve_avatar(
            "  https://cdn/me.png ",
            Some("me.png"),
            ThumbnailKind::Avatar,
            &ThumbnailUrls::default(),
        );
        assert_eq!(source.url(), "https://cdn/me.png");
        assert!(!source.used_fallback());
    }

    #[test]
    fn host_thumbnail_without_template_uses_direct_url() {
        let source = resolve_avatar(
            "",
            Some("seraphina.png"),
            ThumbnailKind::Avatar,
            &ThumbnailUrls::default(),
        );
        assert_eq!(source.url(), "/thumbnail?type=avatar&file=seraphina.png");
        assert!(source.used_fallback());
    }

    #[test]
    fn host_template_is_filled_in() {
        let thumbnails = ThumbnailUrls::new(Some(
            "http://127.0.0.1:8000/thumbnail?type={type}&file={file}".into(),
        ));
        let source = resolve_avatar("", Some("user.png"), ThumbnailKind::Persona, &thumbnails);
        assert_eq!(
            source,
            AvatarSource::Thumbnail {
                url: "http://127.0.0.1:8000/thumbnail?type=persona&file=user.png".into(),
                fallback: false,
            }
        );
    }

    #[test]
    fn nothing_known_uses_default_image() {
        let thumbnails = ThumbnailUrls::new(Some("   ".into()));
        assert!(!thumbnails.has_template());
        let source = resolve_avatar(" ", None, ThumbnailKind::Persona, &thumbnails);
        assert_eq!(source, AvatarSource::Default);
        assert_eq!(source.url(), DEFAULT_AVATAR_PATH);
    }
}
