//! Cmdline template interpolation.
//!
//! Templates use named placeholders in braces:
//! - `{hook_name}`: the event name
//! - `{taskid}`: the task number
//! - `{task_results_dir}`: the task's results directory
//!
//! `{{` and `}}` produce literal braces. Any other name, a format spec such
//! as `{taskid:05}`, or an unmatched brace is rejected.

use std::path::Path;

use retrace_core::TaskId;

/// Values substituted into a template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    /// Event name.
    pub hook_name: &'a str,
    /// Task number.
    pub taskid: TaskId,
    /// Task results directory.
    pub task_results_dir: &'a Path,
}

impl TemplateVars<'_> {
    fn lookup(&self, name: &str) -> Option<String> {
        match name {
            "hook_name" => Some(self.hook_name.to_owned()),
            "taskid" => Some(self.taskid.to_string()),
            "task_results_dir" => Some(self.task_results_dir.to_string_lossy().into_owned()),
            _ => None,
        }
    }
}

/// Why a template could not be interpolated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// A placeholder named something other than the known variables.
    #[error("unknown placeholder '{{{0}}}'")]
    UnknownPlaceholder(String),
    /// A `{` without a closing `}`, or a lone `}`.
    #[error("unbalanced '{brace}' at byte {position}")]
    UnbalancedBrace {
        /// The offending brace character.
        brace: char,
        /// Byte offset in the template.
        position: usize,
    },
}

/// Substitute `vars` into `template`.
pub fn interpolate(template: &str, vars: &TemplateVars<'_>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' => {
                if chars.next_if(|&(_, next)| next == '{').is_some() {
                    out.push('{');
                    continue;
                }
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, '{')) | None => {
                            return Err(TemplateError::UnbalancedBrace {
                                brace: '{',
                                position,
                            });
                        }
                        Some((_, ch)) => name.push(ch),
                    }
                }
                let value = vars
                    .lookup(&name)
                    .ok_or(TemplateError::UnknownPlaceholder(name))?;
                out.push_str(&value);
            }
            '}' => {
                if chars.next_if(|&(_, next)| next == '}').is_none() {
                    return Err(TemplateError::UnbalancedBrace {
                        brace: '}',
                        position,
                    });
                }
                out.push('}');
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn vars() -> TemplateVars<'static> {
        TemplateVars {
            hook_name: "pre_retrace",
            taskid: TaskId::new(123_456_789),
            task_results_dir: Path::new("/var/spool/retrace-server/123456789/results"),
        }
    }

    #[test]
    fn test_substitutes_all_placeholders() {
        let out = interpolate(
            "--event {hook_name} --task {taskid} --out {task_results_dir}",
            &vars(),
        )
        .unwrap();
        assert_eq!(
            out,
            "--event pre_retrace --task 123456789 --out /var/spool/retrace-server/123456789/results"
        );
    }

    #[test]
    fn test_repeated_and_adjacent_placeholders() {
        let out = interpolate("{taskid}{taskid}-{hook_name}", &vars()).unwrap();
        assert_eq!(out, "123456789123456789-pre_retrace");
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(interpolate("--verbose -x", &vars()).unwrap(), "--verbose -x");
        assert_eq!(interpolate("", &vars()).unwrap(), "");
    }

    #[test]
    fn test_doubled_braces_are_literal() {
        let out = interpolate("{{\"id\": {taskid}}}", &vars()).unwrap();
        assert_eq!(out, "{\"id\": 123456789}");
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        assert_matches!(
            interpolate("--task {task_id}", &vars()),
            Err(TemplateError::UnknownPlaceholder(name)) if name == "task_id"
        );
    }

    #[test]
    fn test_format_spec_rejected() {
        assert_matches!(
            interpolate("{taskid:05}", &vars()),
            Err(TemplateError::UnknownPlaceholder(_))
        );
    }

    #[test]
    fn test_empty_placeholder_rejected() {
        assert_matches!(interpolate("{}", &vars()), Err(TemplateError::UnknownPlaceholder(n)) if n.is_empty());
    }

    #[test]
    fn test_unbalanced_braces_rejected() {
        assert_eq!(
            interpolate("--task {taskid", &vars()),
            Err(TemplateError::UnbalancedBrace {
                brace: '{',
                position: 7
            })
        );
        assert_eq!(
            interpolate("oops}", &vars()),
            Err(TemplateError::UnbalancedBrace {
                brace: '}',
                position: 4
            })
        );
        assert_matches!(
            interpolate("{hook{name}", &vars()),
            Err(TemplateError::UnbalancedBrace { brace: '{', .. })
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            TemplateError::UnknownPlaceholder("x".into()).to_string(),
            "unknown placeholder '{x}'"
        );
    }
}
