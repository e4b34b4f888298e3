use std::fmt::{Display, Formatter, Write};
use std::iter::Peekable;
use std::str::{Chars, FromStr};
use anyhow::{anyhow, bail, Context, Error, Result};

/// Represents the type of a field, a parameter or a return value.
///
/// ```
/// use scrivener_entry::descriptor::TypeDescriptor;
///
/// let int_array: TypeDescriptor = "[I".parse().unwrap();
/// assert_eq!(int_array, TypeDescriptor::Array(Box::new(TypeDescriptor::I)));
/// assert_eq!(int_array.to_string(), "[I");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
	/// A `byte`.
	B,
	/// A `char`.
	C,
	/// A `double`, takes up two local variable slots.
	D,
	/// A `float`.
	F,
	/// An `int`.
	I,
	/// A `long`, takes up two local variable slots.
	J,
	/// A `short`.
	S,
	/// A `boolean`.
	Z,
	/// An instance of the class with the given internal name.
	Object(String),
	/// One array dimension around the inner type.
	Array(Box<TypeDescriptor>),
}

// The grammar for descriptors is:
//   FieldDescriptor:
//     FieldType
//
//   MethodDescriptor:
//     "(" FieldType* ")" ReturnDescriptor
//
//   ReturnDescriptor:
//     FieldType | "V"
//
//   FieldType:
//     "B" | "C" | "D" | "F" | "I" | "J" | "S" | "Z" |
//     "L" ClassName ";" |
//     "[" FieldType
fn read_field_type(chars: &mut Peekable<Chars>) -> Result<TypeDescriptor> {
	let char = chars.next().ok_or_else(|| anyhow!("unexpected abrupt ending of descriptor"))?;
	Ok(match char {
		'B' => TypeDescriptor::B,
		'C' => TypeDescriptor::C,
		'D' => TypeDescriptor::D,
		'F' => TypeDescriptor::F,
		'I' => TypeDescriptor::I,
		'J' => TypeDescriptor::J,
		'S' => TypeDescriptor::S,
		'Z' => TypeDescriptor::Z,
		'L' => {
			let mut class_name = String::new();
			loop {
				match chars.next() {
					Some(';') => break,
					Some(char) => class_name.push(char),
					None => bail!("unexpected abrupt ending of descriptor, missing ';' after {class_name:?}"),
				}
			}
			if class_name.is_empty() {
				bail!("empty class name in descriptor");
			}
			TypeDescriptor::Object(class_name)
		},
		'[' => TypeDescriptor::Array(Box::new(read_field_type(chars)?)),
		x => bail!("unexpected char {x:?} in descriptor"),
	})
}

impl TypeDescriptor {
	pub fn object(class_name: impl Into<String>) -> TypeDescriptor {
		TypeDescriptor::Object(class_name.into())
	}

	pub fn is_primitive(&self) -> bool {
		!matches!(self, TypeDescriptor::Object(_) | TypeDescriptor::Array(_))
	}

	pub fn is_array(&self) -> bool {
		matches!(self, TypeDescriptor::Array(_))
	}

	/// The number of local variable slots a value of this type occupies.
	pub fn size(&self) -> u16 {
		match self {
			TypeDescriptor::D | TypeDescriptor::J => 2,
			_ => 1,
		}
	}

	/// Returns the class name of an object type, `None` for primitives and arrays.
	pub fn as_object(&self) -> Option<&str> {
		match self {
			TypeDescriptor::Object(class_name) => Some(class_name),
			_ => None,
		}
	}

	/// Returns the class name found at the bottom of any array dimensions.
	pub fn element_class(&self) -> Option<&str> {
		match self {
			TypeDescriptor::Object(class_name) => Some(class_name),
			TypeDescriptor::Array(inner) => inner.element_class(),
			_ => None,
		}
	}

	/// Replaces every class name contained in this type.
	pub fn remap(&self, remap: &mut impl FnMut(&str) -> String) -> TypeDescriptor {
		match self {
			TypeDescriptor::Object(class_name) => TypeDescriptor::Object(remap(class_name)),
			TypeDescriptor::Array(inner) => TypeDescriptor::Array(Box::new(inner.remap(remap))),
			primitive => primitive.clone(),
		}
	}
}

impl FromStr for TypeDescriptor {
	type Err = Error;

	fn from_str(s: &str) -> Result<TypeDescriptor> {
		let mut chars = s.chars().peekable();
		let descriptor = read_field_type(&mut chars)
			.with_context(|| anyhow!("failed to parse field descriptor {s:?}"))?;
		if chars.peek().is_some() {
			bail!("expected end of field descriptor {s:?}, got {:?} remaining", chars.collect::<String>());
		}
		Ok(descriptor)
	}
}

impl Display for TypeDescriptor {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			TypeDescriptor::B => f.write_char('B'),
			TypeDescriptor::C => f.write_char('C'),
			TypeDescriptor::D => f.write_char('D'),
			TypeDescriptor::F => f.write_char('F'),
			TypeDescriptor::I => f.write_char('I'),
			TypeDescriptor::J => f.write_char('J'),
			TypeDescriptor::S => f.write_char('S'),
			TypeDescriptor::Z => f.write_char('Z'),
			TypeDescriptor::Object(class_name) => write!(f, "L{class_name};"),
			TypeDescriptor::Array(inner) => write!(f, "[{inner}"),
		}
	}
}

/// A parsed method descriptor. A `return_type` of `None` is `V`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
	pub parameters: Vec<TypeDescriptor>,
	pub return_type: Option<TypeDescriptor>,
}

impl MethodDescriptor {
	/// Two methods can only conflict if their argument lists are equal, the return type doesn't matter for that.
	pub fn can_conflict_with(&self, other: &MethodDescriptor) -> bool {
		self.parameters == other.parameters
	}

	/// Returns the number of local variable slots the arguments take up, not counting `this`.
	pub fn arguments_size(&self) -> u16 {
		self.parameters.iter().map(TypeDescriptor::size).sum()
	}

	pub fn remap(&self, remap: &mut impl FnMut(&str) -> String) -> MethodDescriptor {
		MethodDescriptor {
			parameters: self.parameters.iter().map(|parameter| parameter.remap(remap)).collect(),
			return_type: self.return_type.as_ref().map(|return_type| return_type.remap(remap)),
		}
	}

	/// Iterates over all class names used anywhere in the descriptor.
	pub fn classes(&self) -> impl Iterator<Item=&str> {
		self.parameters.iter()
			.chain(self.return_type.iter())
			.filter_map(TypeDescriptor::element_class)
	}
}

impl FromStr for MethodDescriptor {
	type Err = Error;

	fn from_str(s: &str) -> Result<MethodDescriptor> {
		let mut chars = s.chars().peekable();

		if chars.next_if_eq(&'(').is_none() {
			bail!("method descriptor {s:?} doesn't start with '('");
		}

		let mut parameters = Vec::new();
		loop {
			if chars.next_if_eq(&')').is_some() {
				break;
			}

			let descriptor = read_field_type(&mut chars)
				.with_context(|| anyhow!("failed to read parameter descriptor of {s:?}"))?;
			parameters.push(descriptor);
		}

		let return_type = if chars.next_if_eq(&'V').is_some() {
			None
		} else {
			let descriptor = read_field_type(&mut chars)
				.with_context(|| anyhow!("failed to read return descriptor of {s:?}"))?;
			Some(descriptor)
		};

		if chars.peek().is_some() {
			bail!("expected end of method descriptor {s:?}, got {:?} remaining", chars.collect::<String>());
		}

		Ok(MethodDescriptor { parameters, return_type })
	}
}

impl Display for MethodDescriptor {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_char('(')?;
		for parameter in &self.parameters {
			write!(f, "{parameter}")?;
		}
		f.write_char(')')?;
		match &self.return_type {
			Some(return_type) => write!(f, "{return_type}"),
			None => f.write_char('V'),
		}
	}
}

/// Replaces the class names inside a generic signature, like `Ljava/util/List<La;>;` or `<T:La;>(TT;)V`.
///
/// Type variables (`T...;`) are copied as-is. Inner class suffixes after a `.` are kept, only the outer
/// class name gets remapped.
pub fn remap_signature(signature: &str, remap: &mut impl FnMut(&str) -> String) -> Result<String> {
	let mut out = String::with_capacity(signature.len());
	let mut chars = signature.chars().peekable();

	while let Some(char) = chars.next() {
		match char {
			'L' => {
				out.push('L');
				let mut class_name = String::new();
				while let Some(&next) = chars.peek() {
					if matches!(next, ';' | '<' | '.') {
						break;
					}
					class_name.push(next);
					chars.next();
				}
				if chars.peek().is_none() {
					bail!("signature {signature:?} ends in the middle of class name {class_name:?}");
				}
				out.push_str(&remap(&class_name));
			},
			'T' => {
				// a type variable, keep the name
				out.push('T');
				for next in chars.by_ref() {
					out.push(next);
					if next == ';' {
						break;
					}
				}
			},
			'.' => {
				// simple name of an inner class, never remapped on its own
				out.push('.');
				while let Some(&next) = chars.peek() {
					if matches!(next, ';' | '<' | '.') {
						break;
					}
					out.push(next);
					chars.next();
				}
			},
			'<' => {
				out.push('<');
				// formal type parameters at the start look like `<T:Ljava/lang/Object;>`, identifiers there
				// start right after `<` or `;`, and are followed by ':'
				if out.len() == 1 {
					copy_formal_type_parameters(&mut chars, &mut out, remap)?;
				}
			},
			other => out.push(other),
		}
	}

	Ok(out)
}

fn copy_formal_type_parameters(chars: &mut Peekable<Chars>, out: &mut String, remap: &mut impl FnMut(&str) -> String) -> Result<()> {
	loop {
		// identifier
		while let Some(&next) = chars.peek() {
			if next == ':' || next == '>' {
				break;
			}
			out.push(next);
			chars.next();
		}
		// bounds, each starting with ':' (the class bound may be empty)
		while chars.next_if_eq(&':').is_some() {
			out.push(':');
			if chars.peek().is_some_and(|&c| c != ':') {
				let bound = read_signature_type(chars)?;
				out.push_str(&remap_signature(&bound, remap)?);
			}
		}
		if chars.next_if_eq(&'>').is_some() {
			out.push('>');
			return Ok(());
		}
		if chars.peek().is_none() {
			bail!("unexpected end of formal type parameters");
		}
	}
}

/// Reads one reference type signature, keeping track of nested `<>`.
fn read_signature_type(chars: &mut Peekable<Chars>) -> Result<String> {
	let mut s = String::new();
	let mut depth = 0usize;
	while chars.peek() == Some(&'[') {
		s.push('[');
		chars.next();
	}
	for char in chars.by_ref() {
		s.push(char);
		match char {
			'<' => depth += 1,
			'>' => depth = depth.checked_sub(1).ok_or_else(|| anyhow!("unbalanced '>' in signature"))?,
			';' if depth == 0 => return Ok(s),
			_ => {},
		}
	}
	bail!("unexpected end of signature while reading {s:?}")
}
