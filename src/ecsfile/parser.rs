use tracing::debug;

use crate::constants::ARCHITECTURES;
use crate::error::PackError;

/// One recognized Ecsfile directive. Unknown keywords never make it here;
/// the parser drops them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Arch(String),
    Mount {
        destination: String,
        source: String,
        options: Vec<String>,
    },
    Env(String),
    Cmd(Vec<String>),
    Workdir(String),
    Copy {
        from: String,
        to: String,
    },
}

/// Parse Ecsfile text into directives.
///
/// Blank lines and `#` comments are skipped, runs of whitespace collapse
/// into single separators, and unknown directives are ignored. Malformed
/// `ENV` expressions and unsupported `ARCH` values are fatal and carry the
/// offending (1-based) line number.
pub fn parse(content: &str) -> Result<Vec<Directive>, PackError> {
    let mut directives = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let mut parts = raw.split_whitespace();
        let keyword = match parts.next() {
            Some(keyword) => keyword,
            None => continue,
        };
        if keyword.starts_with('#') {
            continue;
        }
        let args: Vec<&str> = parts.collect();

        match keyword {
            "ARCH" => {
                let arch = required(&args, 0, "ARCH", 1, line)?;
                if !ARCHITECTURES.contains(&arch) {
                    return Err(PackError::UnsupportedArch {
                        arch: arch.to_string(),
                        line,
                    });
                }
                directives.push(Directive::Arch(arch.to_string()));
            }
            "MOUNT" => {
                let destination = required(&args, 0, "MOUNT", 2, line)?;
                let source = required(&args, 1, "MOUNT", 2, line)?;
                directives.push(Directive::Mount {
                    destination: destination.to_string(),
                    source: source.to_string(),
                    options: args[2..].iter().map(|s| s.to_string()).collect(),
                });
            }
            "ENV" => {
                let expr = required(&args, 0, "ENV", 1, line)?;
                if expr.matches('=').count() != 1 {
                    return Err(PackError::InvalidEnv {
                        expr: expr.to_string(),
                        line,
                    });
                }
                directives.push(Directive::Env(expr.to_string()));
            }
            "CMD" => {
                directives.push(Directive::Cmd(
                    args.iter().map(|s| s.to_string()).collect(),
                ));
            }
            "WORKDIR" => {
                let path = required(&args, 0, "WORKDIR", 1, line)?;
                directives.push(Directive::Workdir(path.to_string()));
            }
            "ADD" | "COPY" => {
                let from = required(&args, 0, keyword, 2, line)?;
                let to = required(&args, 1, keyword, 2, line)?;
                directives.push(Directive::Copy {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
            other => {
                debug!(directive = other, line, "ignoring unknown directive");
            }
        }
    }

    Ok(directives)
}

fn required<'a>(
    args: &[&'a str],
    index: usize,
    directive: &str,
    expected: usize,
    line: usize,
) -> Result<&'a str, PackError> {
    args.get(index).copied().ok_or_else(|| PackError::MissingArgs {
        directive: directive.to_string(),
        expected,
        line,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_directives_parse() {
        let directives = parse(
            "# build the demo image\n\
             ARCH arm64\n\
             MOUNT /lib /lib rx ro\n\
             ENV PATH=/bin\n\
             CMD /apps/start --fast\n\
             WORKDIR /apps\n\
             COPY app.bin /apps/app.bin\n",
        )
        .unwrap();

        assert_eq!(directives.len(), 6);
        assert_eq!(directives[0], Directive::Arch("arm64".to_string()));
        assert_eq!(
            directives[1],
            Directive::Mount {
                destination: "/lib".to_string(),
                source: "/lib".to_string(),
                options: vec!["rx".to_string(), "ro".to_string()],
            }
        );
        assert_eq!(
            directives[3],
            Directive::Cmd(vec!["/apps/start".to_string(), "--fast".to_string()])
        );
    }

    #[test]
    fn unknown_directives_are_ignored() {
        let directives = parse("FROM scratch\nARCH arm\nLABEL x=y\n").unwrap();
        assert_eq!(directives, vec![Directive::Arch("arm".to_string())]);
    }

    #[test]
    fn unsupported_arch_reports_its_line() {
        let err = parse("ENV A=b\nARCH z80\n").unwrap_err();
        match err {
            PackError::UnsupportedArch { arch, line } => {
                assert_eq!(arch, "z80");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn env_must_have_exactly_one_equals() {
        assert!(matches!(
            parse("ENV NOVALUE\n"),
            Err(PackError::InvalidEnv { line: 1, .. })
        ));
        assert!(matches!(
            parse("\nENV A=b=c\n"),
            Err(PackError::InvalidEnv { line: 2, .. })
        ));
        assert!(parse("ENV A=b\n").is_ok());
    }

    #[test]
    fn extra_whitespace_collapses() {
        let directives = parse("  MOUNT   /dst    /src   rx  \n").unwrap();
        assert_eq!(
            directives,
            vec![Directive::Mount {
                destination: "/dst".to_string(),
                source: "/src".to_string(),
                options: vec!["rx".to_string()],
            }]
        );
    }
}
