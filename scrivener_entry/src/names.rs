//! Checks for names a user may give to classes, members, and local variables.
//!
//! The class file format allows a lot more than the Java language does. Since renamed code is meant to be read
//! (and possibly recompiled) as Java source, these checks use the rules of the Java language.

use crate::validation::{Message, ValidationContext};

const RESERVED: [&str; 53] = [
	"abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
	"continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
	"for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long", "native",
	"new", "package", "private", "protected", "public", "return", "short", "static", "strictfp", "super",
	"switch", "synchronized", "this", "throw", "throws", "transient", "try", "void", "volatile", "while",
	// literals
	"true", "false", "null",
];

pub fn is_reserved(name: &str) -> bool {
	RESERVED.contains(&name)
}

fn is_identifier_start(c: char) -> bool {
	c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
	is_identifier_start(c) || c.is_numeric()
}

/// Checks a name used for fields, methods and local variables, raising into `ctx` on failure.
pub fn validate_identifier(ctx: &mut ValidationContext, name: &str) {
	if name.is_empty() {
		ctx.raise(Message::EMPTY_FIELD, std::iter::empty::<String>());
		return;
	}

	for (i, c) in name.chars().enumerate() {
		let valid = if i == 0 { is_identifier_start(c) } else { is_identifier_part(c) };
		if !valid {
			ctx.raise(Message::ILLEGAL_IDENTIFIER, [name.to_owned(), c.to_string(), (i + 1).to_string()]);
			return;
		}
	}

	if is_reserved(name) {
		ctx.raise(Message::RESERVED_IDENTIFIER, [name]);
	}
}

/// Checks a class name. Only top level classes may have a package (`a/b/C`), inner classes only get a
/// simple name.
pub fn validate_class_name(ctx: &mut ValidationContext, name: &str, is_inner: bool) {
	if name.is_empty() {
		ctx.raise(Message::EMPTY_FIELD, std::iter::empty::<String>());
		return;
	}

	match name.rsplit_once('/') {
		Some(_) if is_inner => {
			ctx.raise(Message::INVALID_PACKAGE_NAME, [name]);
		},
		Some((package, simple)) => {
			validate_package_name(ctx, package);
			validate_identifier(ctx, simple);
		},
		None => validate_identifier(ctx, name),
	}
}

/// Checks a package name like `com/example/util`.
pub fn validate_package_name(ctx: &mut ValidationContext, package: &str) {
	if package.split('/').any(|segment| segment.is_empty()) {
		ctx.raise(Message::INVALID_PACKAGE_NAME, [package]);
		return;
	}
	for segment in package.split('/') {
		validate_identifier(ctx, segment);
	}
}

/// A javadoc comment must not end the comment it is placed in.
pub fn validate_javadoc(ctx: &mut ValidationContext, javadoc: &str) {
	if javadoc.contains("*/") {
		ctx.raise(Message::ILLEGAL_DOC_COMMENT_END, std::iter::empty::<String>());
	}
}
