use std::fmt::{Debug, Formatter};

/// The access flags of a class, field or method, as they appear in the class file.
///
/// Some bits mean different things depending on what they're attached to, `0x0040` is `volatile` for fields,
/// but `bridge` for methods.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AccessFlags(pub u16);

impl AccessFlags {
	pub const PUBLIC: u16 = 0x0001;
	pub const PRIVATE: u16 = 0x0002;
	pub const PROTECTED: u16 = 0x0004;
	pub const STATIC: u16 = 0x0008;
	pub const FINAL: u16 = 0x0010;
	pub const SYNCHRONIZED: u16 = 0x0020;
	pub const BRIDGE: u16 = 0x0040;
	pub const VARARGS: u16 = 0x0080;
	pub const NATIVE: u16 = 0x0100;
	pub const INTERFACE: u16 = 0x0200;
	pub const ABSTRACT: u16 = 0x0400;
	pub const STRICT: u16 = 0x0800;
	pub const SYNTHETIC: u16 = 0x1000;
	pub const ANNOTATION: u16 = 0x2000;
	pub const ENUM: u16 = 0x4000;

	pub const fn new(flags: u16) -> AccessFlags {
		AccessFlags(flags)
	}

	const fn has(self, flag: u16) -> bool {
		self.0 & flag != 0
	}

	pub const fn with(self, flag: u16) -> AccessFlags {
		AccessFlags(self.0 | flag)
	}

	pub fn is_public(self) -> bool { self.has(Self::PUBLIC) }
	pub fn is_private(self) -> bool { self.has(Self::PRIVATE) }
	pub fn is_protected(self) -> bool { self.has(Self::PROTECTED) }
	pub fn is_static(self) -> bool { self.has(Self::STATIC) }
	pub fn is_final(self) -> bool { self.has(Self::FINAL) }
	pub fn is_bridge(self) -> bool { self.has(Self::BRIDGE) }
	pub fn is_interface(self) -> bool { self.has(Self::INTERFACE) }
	pub fn is_abstract(self) -> bool { self.has(Self::ABSTRACT) }
	pub fn is_synthetic(self) -> bool { self.has(Self::SYNTHETIC) }
	pub fn is_enum(self) -> bool { self.has(Self::ENUM) }

	/// Package-private, so neither public, protected nor private.
	pub fn is_package_private(self) -> bool {
		!self.is_public() && !self.is_protected() && !self.is_private()
	}
}

impl From<u16> for AccessFlags {
	fn from(value: u16) -> Self {
		AccessFlags(value)
	}
}

impl Debug for AccessFlags {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		const NAMES: [(u16, &str); 15] = [
			(AccessFlags::PUBLIC, "public"),
			(AccessFlags::PRIVATE, "private"),
			(AccessFlags::PROTECTED, "protected"),
			(AccessFlags::STATIC, "static"),
			(AccessFlags::FINAL, "final"),
			(AccessFlags::SYNCHRONIZED, "synchronized"),
			(AccessFlags::BRIDGE, "bridge"),
			(AccessFlags::VARARGS, "varargs"),
			(AccessFlags::NATIVE, "native"),
			(AccessFlags::INTERFACE, "interface"),
			(AccessFlags::ABSTRACT, "abstract"),
			(AccessFlags::STRICT, "strict"),
			(AccessFlags::SYNTHETIC, "synthetic"),
			(AccessFlags::ANNOTATION, "annotation"),
			(AccessFlags::ENUM, "enum"),
		];
		let mut list = f.debug_list();
		for (flag, name) in NAMES {
			if self.has(flag) {
				list.entry(&format_args!("{name}"));
			}
		}
		list.finish()
	}
}
