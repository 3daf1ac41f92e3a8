// Filename templates.
// Release filenames are written with a single `{{.Version}}` placeholder, e.g.
// `rancher-darwin-amd64-{{.Version}}.tar.gz`.

use crate::libs::errors::InstallError;

const VERSION_VARIABLE: &str = ".Version";

/// Substitutes `version` for every `{{.Version}}` in `template`.
///
/// Whitespace inside the braces is tolerated (`{{ .Version }}`). Any other variable, or an
/// opening `{{` without its closing `}}`, is a template error.
pub fn expand_filename_template(template: &str, version: &str) -> Result<String, InstallError> {
    let mut expanded = String::with_capacity(template.len() + version.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        expanded.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let close = after_open.find("}}").ok_or_else(|| InstallError::Template {
            template: template.to_string(),
            reason: "unterminated '{{'".to_string(),
        })?;

        let variable = after_open[..close].trim();
        if variable != VERSION_VARIABLE {
            return Err(InstallError::Template {
                template: template.to_string(),
                reason: format!("unknown variable '{}'", variable),
            });
        }
        expanded.push_str(version);
        rest = &after_open[close + 2..];
    }
    expanded.push_str(rest);
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_version() {
        assert_eq!(
            expand_filename_template("tool-{{.Version}}.tar.gz", "2.0.0").unwrap(),
            "tool-2.0.0.tar.gz"
        );
        assert_eq!(
            expand_filename_template("rancher-windows-amd64-{{ .Version }}.zip", "v0.4.1").unwrap(),
            "rancher-windows-amd64-v0.4.1.zip"
        );
    }

    #[test]
    fn test_template_without_variable_is_unchanged() {
        assert_eq!(
            expand_filename_template("docker-machine-Darwin-x86_64", "v0.8.2").unwrap(),
            "docker-machine-Darwin-x86_64"
        );
    }

    #[test]
    fn test_unknown_variable_is_rejected() {
        let err = expand_filename_template("tool-{{.Arch}}.tar.gz", "1.0.0").unwrap_err();
        assert!(err.is_parse_error());
        assert!(err.to_string().contains(".Arch"));
    }

    #[test]
    fn test_unterminated_braces_are_rejected() {
        let err = expand_filename_template("tool-{{.Version.tar.gz", "1.0.0").unwrap_err();
        assert!(matches!(err, InstallError::Template { .. }));
    }
}
