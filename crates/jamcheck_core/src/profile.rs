//! Build-configuration rendering of expected paths.
//!
//! Test authors write expectations once, in a toolset-neutral form such as `bin/$toolset/debug/hello.exe`. The active
//! [`BuildProfile`] substitutes the configuration placeholders and translates Windows-style suffixes to what a
//! Unix-style toolset actually produces (`hello.exe` becomes `hello`, `x.obj` becomes `x.o`).

/// Naming convention of the artifacts a toolset produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixStyle {
    /// Names are used verbatim (`.obj`, `.exe`, `.lib`, `.dll`).
    Windows,
    /// Windows suffixes are translated (`.o`, no suffix, `lib*.a`, `lib*.so`).
    Unix,
}

const WINDOWS_TOOLSETS: &[&str] = &["msvc", "intel-win", "borland", "cw"];

impl SuffixStyle {
    /// Pick the style a toolset uses.
    ///
    /// Toolset names may carry a version (`msvc-14.3`, `gcc-13`); only the family prefix matters.
    pub fn for_toolset(toolset: &str) -> Self {
        if WINDOWS_TOOLSETS.iter().any(|family| toolset.starts_with(family)) {
            SuffixStyle::Windows
        } else {
            SuffixStyle::Unix
        }
    }
}

/// The active build configuration, as far as expected output names depend on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildProfile {
    pub toolset: String,
    pub variant: String,
    /// `None` disables suffix translation entirely.
    pub suffix_style: Option<SuffixStyle>,
}

impl BuildProfile {
    /// Create a profile with the suffix style implied by the toolset.
    pub fn new(toolset: impl Into<String>, variant: impl Into<String>) -> Self {
        let toolset = toolset.into();
        let suffix_style = Some(SuffixStyle::for_toolset(&toolset));
        Self {
            toolset,
            variant: variant.into(),
            suffix_style,
        }
    }

    /// Disable suffix translation.
    pub fn verbatim(mut self) -> Self {
        self.suffix_style = None;
        self
    }

    /// Render one expected path for this profile.
    ///
    /// ## Parameters
    /// - `path`: an expected path, possibly containing `$toolset` / `$variant` placeholders.
    ///
    /// ## Returns
    /// - (`String`): the path with placeholders substituted and the final component's suffix translated.
    ///
    /// ## Examples
    /// ```rust
    /// use jamcheck_core::BuildProfile;
    /// let profile = BuildProfile::new("gcc", "debug");
    /// assert_eq!(profile.render("bin/$toolset/$variant/hello.obj"), "bin/gcc/debug/hello.o");
    /// assert_eq!(profile.render("bin/$toolset/$variant/hello.exe"), "bin/gcc/debug/hello");
    /// ```
    pub fn render(&self, path: &str) -> String {
        let substituted = path
            .replace("$toolset", &self.toolset)
            .replace("$variant", &self.variant);

        match self.suffix_style {
            Some(SuffixStyle::Unix) => translate_suffix(&substituted),
            Some(SuffixStyle::Windows) | None => substituted,
        }
    }
}

fn translate_suffix(path: &str) -> String {
    let (dir, name) = match path.rfind('/') {
        Some(pos) => path.split_at(pos + 1),
        None => ("", path),
    };
    let Some(dot) = name.rfind('.') else {
        return path.to_string();
    };
    let (stem, suffix) = name.split_at(dot);

    match suffix {
        ".obj" => format!("{dir}{stem}.o"),
        ".exe" => format!("{dir}{stem}"),
        ".lib" => format!("{dir}lib{stem}.a"),
        ".dll" => format!("{dir}lib{stem}.so"),
        _ => path.to_string(),
    }
}
