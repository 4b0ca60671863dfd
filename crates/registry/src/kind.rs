use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Category of cryptographic primitive an implementation provides.
///
/// All kinds share the same registry and fetch machinery; the kind only
/// partitions the name space, so `"SHA256"` as a digest and `"SHA256"` as a
/// MAC are unrelated entries.
#[derive(
	Debug,
	Clone,
	Copy,
	PartialEq,
	Eq,
	Hash,
	PartialOrd,
	Ord,
	Display,
	EnumString,
	EnumIter,
	IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum AlgorithmKind {
	Digest,
	Cipher,
	Mac,
	Kdf,
	KeyExchange,
	Signature,
	Kem,
	Rand,
	KeyManagement,
}
