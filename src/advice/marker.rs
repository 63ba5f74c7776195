use crate::advice::Error;
use crate::jvm::class_graph::{accepts_string, Annotation, ElementValue, MethodId};
use crate::jvm::{BinaryName, Name, RenderDescriptor, UnqualifiedName};

/// What an advice parameter is bound to in the instrumented method
///
/// Markers that can be `read_only` reject advice code that writes to the parameter. Writable
/// ones must be declared with exactly the type they are bound to.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ParameterMarker {
    /// Receiver of the instrumented method
    This { read_only: bool },

    /// Argument of the instrumented method (by index, not by slot)
    Argument { index: usize, read_only: bool },

    /// Value returned by the entry advice (exit only)
    Enter { read_only: bool },

    /// Value returned by the instrumented method (exit only)
    Return { read_only: bool },

    /// Exception thrown by the instrumented method, or `null` (exit only)
    Thrown,

    /// Reads produce the default value of the type and writes are dropped
    Ignored,

    /// String describing the instrumented method
    Origin(OriginPattern),

    /// Value of a field of the instrumented type, looked up by name
    FieldValue(UnqualifiedName),
}

impl ParameterMarker {
    /// Is this marker only meaningful when the method exits?
    ///
    /// The entered value is not included: entry advice reading it is a binding error of its own.
    pub fn is_exit_only(&self) -> bool {
        matches!(self, ParameterMarker::Return { .. } | ParameterMarker::Thrown)
    }

    /// Markers for every parameter of an advice method
    ///
    /// Parameters without a marker annotation are bound (read-only) to the argument at the same
    /// position.
    pub fn of_method(method: MethodId<'_>) -> Result<Vec<ParameterMarker>, Error> {
        let invalid = |reason: String| Error::InvalidDonor {
            donor: format!("{:?}", method),
            reason,
        };

        let mut markers = vec![];
        for (parameter, parameter_type) in method.descriptor.parameters.iter().enumerate() {
            let mut found: Option<ParameterMarker> = None;
            for annotation in method.parameter_annotations(parameter) {
                let marker = match Self::from_annotation(annotation) {
                    Ok(Some(marker)) => marker,
                    Ok(None) => continue,
                    Err(reason) => {
                        return Err(invalid(format!("parameter {}: {}", parameter, reason)))
                    }
                };
                if found.replace(marker).is_some() {
                    return Err(invalid(format!(
                        "parameter {} has more than one marker",
                        parameter
                    )));
                }
            }
            let is_origin = matches!(found, Some(ParameterMarker::Origin(_)));
            if is_origin && !accepts_string(parameter_type) {
                return Err(invalid(format!(
                    "parameter {} cannot hold the origin string",
                    parameter
                )));
            }
            markers.push(found.unwrap_or(ParameterMarker::Argument {
                index: parameter,
                read_only: true,
            }));
        }
        Ok(markers)
    }

    /// Interpret one parameter annotation (`None` if it isn't a marker)
    fn from_annotation(annotation: &Annotation) -> Result<Option<ParameterMarker>, String> {
        let annotation_type = &annotation.annotation_type;
        let marker = if *annotation_type == BinaryName::ADVICE_THIS {
            ParameterMarker::This {
                read_only: read_only(annotation)?,
            }
        } else if *annotation_type == BinaryName::ADVICE_ENTER {
            ParameterMarker::Enter {
                read_only: read_only(annotation)?,
            }
        } else if *annotation_type == BinaryName::ADVICE_RETURN {
            ParameterMarker::Return {
                read_only: read_only(annotation)?,
            }
        } else if *annotation_type == BinaryName::ADVICE_THROWN {
            ParameterMarker::Thrown
        } else if *annotation_type == BinaryName::ADVICE_IGNORED {
            ParameterMarker::Ignored
        } else if *annotation_type == BinaryName::ADVICE_ARGUMENT {
            let index = match annotation.element(&UnqualifiedName::VALUE) {
                Some(ElementValue::Int(index)) => usize::try_from(*index)
                    .map_err(|_| format!("negative argument index {}", index))?,
                Some(other) => return Err(format!("argument index {:?} is not an int", other)),
                None => return Err(String::from("argument marker without an index")),
            };
            ParameterMarker::Argument {
                index,
                read_only: read_only(annotation)?,
            }
        } else if *annotation_type == BinaryName::ADVICE_ORIGIN {
            let pattern = match annotation.element(&UnqualifiedName::VALUE) {
                Some(ElementValue::String(pattern)) => OriginPattern::parse(pattern)?,
                Some(other) => return Err(format!("origin pattern {:?} is not a string", other)),
                None => OriginPattern::default(),
            };
            ParameterMarker::Origin(pattern)
        } else if *annotation_type == BinaryName::ADVICE_FIELD_VALUE {
            match annotation.element(&UnqualifiedName::VALUE) {
                Some(ElementValue::String(name)) => ParameterMarker::FieldValue(
                    UnqualifiedName::from_string(name.to_string())?,
                ),
                Some(other) => return Err(format!("field name {:?} is not a string", other)),
                None => return Err(String::from("field value marker without a field name")),
            }
        } else {
            return Ok(None);
        };
        Ok(Some(marker))
    }
}

/// `readOnly` element of a marker, which defaults to `true`
fn read_only(annotation: &Annotation) -> Result<bool, String> {
    match annotation.element(&UnqualifiedName::READ_ONLY) {
        None => Ok(true),
        Some(ElementValue::Boolean(read_only)) => Ok(*read_only),
        Some(other) => Err(format!("readOnly {:?} is not a boolean", other)),
    }
}

/// Template for the string a [`ParameterMarker::Origin`] parameter receives
///
/// In the pattern, `#t` is replaced by the name of the declaring type, `#m` by the method name,
/// and `#d` by the method descriptor. A literal `#` is written as `\#` and a literal backslash as
/// `\\`. The empty pattern is the same as `#t.#m#d`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OriginPattern(Vec<OriginPart>);

#[derive(Clone, PartialEq, Eq, Debug)]
enum OriginPart {
    Text(String),
    TypeName,
    MethodName,
    Descriptor,
}

impl OriginPattern {
    pub fn parse(pattern: &str) -> Result<OriginPattern, String> {
        if pattern.is_empty() {
            return Ok(OriginPattern::default());
        }

        let mut parts = vec![];
        let mut text = String::new();
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped @ ('#' | '\\')) => text.push(escaped),
                    Some(other) => {
                        text.push('\\');
                        text.push(other);
                    }
                    None => text.push('\\'),
                },
                '#' => {
                    let part = match chars.next() {
                        Some('t') => OriginPart::TypeName,
                        Some('m') => OriginPart::MethodName,
                        Some('d') => OriginPart::Descriptor,
                        Some(other) => {
                            return Err(format!(
                                "unknown '#{}' in origin pattern {:?}",
                                other, pattern
                            ))
                        }
                        None => {
                            return Err(format!("dangling '#' in origin pattern {:?}", pattern))
                        }
                    };
                    if !text.is_empty() {
                        parts.push(OriginPart::Text(std::mem::take(&mut text)));
                    }
                    parts.push(part);
                }
                other => text.push(other),
            }
        }
        if !text.is_empty() {
            parts.push(OriginPart::Text(text));
        }
        Ok(OriginPattern(parts))
    }

    /// Fill in the pattern for a method
    pub fn render(&self, method: MethodId<'_>) -> String {
        let mut rendered = String::new();
        for part in &self.0 {
            match part {
                OriginPart::Text(text) => rendered.push_str(text),
                OriginPart::TypeName => {
                    rendered.push_str(&method.class.name.as_str().replace('/', "."))
                }
                OriginPart::MethodName => rendered.push_str(method.name.as_str()),
                OriginPart::Descriptor => method.descriptor.render_to(&mut rendered),
            }
        }
        rendered
    }
}

impl Default for OriginPattern {
    fn default() -> OriginPattern {
        OriginPattern(vec![
            OriginPart::TypeName,
            OriginPart::Text(String::from(".")),
            OriginPart::MethodName,
            OriginPart::Descriptor,
        ])
    }
}
