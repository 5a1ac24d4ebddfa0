use std::io;

use bytes::Bytes;
use log::debug;
use rand::{CryptoRng, Rng};

use crate::async_result::AsyncResult;
use crate::composed::message::decrypt::decrypt_with_skesks;
use crate::composed::message::MessageEncryptionOptions;
use crate::composed::shared::Deserializable;
use crate::errors::{Error, Result};
use crate::packet::{
    CompressedData, LiteralData, OnePassSignature, Packet, PacketTrait,
    PublicKeyEncryptedSessionKey, Signature, SignatureType, SymEncryptedData,
    SymEncryptedProtectedData, SymKeyEncryptedSessionKey,
};
use crate::registry::AlgorithmRegistry;
use crate::ser::Serialize;
use crate::types::{
    CompressionAlgorithm, KeyDetails, KeyId, Password, PlainSessionKey, SecretKeyTrait,
    StringToKey, Tag,
};

/// How many compressed layers are unwrapped before giving up.
pub const MAX_NESTING_LEVEL: usize = 20;

/// An [OpenPGP message](https://www.rfc-editor.org/rfc/rfc4880.html#section-11.3)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Literal(LiteralData),
    Compressed(CompressedData),
    Signed {
        /// nested message
        message: Box<Message>,
        /// for signature packets that contain a one pass message
        one_pass_signature: Option<OnePassSignature>,
        // actual signature
        signature: Signature,
    },
    Encrypted {
        esk: Vec<Esk>,
        edata: Edata,
    },
}

/// Outcome of [`Message::verify`], by issuer key id.
///
/// Signatures by keys that were not passed in appear in neither list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyResult {
    pub success: Vec<KeyId>,
    pub failure: Vec<KeyId>,
}

/// Encrypted Session Key
/// Public-Key Encrypted Session Key Packet |
/// Symmetric-Key Encrypted Session Key Packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Esk {
    PublicKeyEncryptedSessionKey(PublicKeyEncryptedSessionKey),
    SymKeyEncryptedSessionKey(SymKeyEncryptedSessionKey),
}

impl Serialize for Esk {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Esk::PublicKeyEncryptedSessionKey(k) => k.to_writer_with_header(writer),
            Esk::SymKeyEncryptedSessionKey(k) => k.to_writer_with_header(writer),
        }
    }

    fn write_len(&self) -> usize {
        match self {
            Esk::PublicKeyEncryptedSessionKey(k) => k.write_len_with_header(),
            Esk::SymKeyEncryptedSessionKey(k) => k.write_len_with_header(),
        }
    }
}

impl_try_from_into!(
    Esk,
    PublicKeyEncryptedSessionKey => PublicKeyEncryptedSessionKey,
    SymKeyEncryptedSessionKey => SymKeyEncryptedSessionKey
);

impl Esk {
    pub fn tag(&self) -> Tag {
        match self {
            Esk::PublicKeyEncryptedSessionKey(_) => Tag::PublicKeyEncryptedSessionKey,
            Esk::SymKeyEncryptedSessionKey(_) => Tag::SymKeyEncryptedSessionKey,
        }
    }
}

impl TryFrom<Packet> for Esk {
    type Error = Error;

    fn try_from(other: Packet) -> Result<Esk> {
        match other {
            Packet::PublicKeyEncryptedSessionKey(k) => Ok(Esk::PublicKeyEncryptedSessionKey(k)),
            Packet::SymKeyEncryptedSessionKey(k) => Ok(Esk::SymKeyEncryptedSessionKey(k)),
            _ => Err(format_err!("not a valid esk packet: {:?}", other.tag())),
        }
    }
}

impl From<Esk> for Packet {
    fn from(other: Esk) -> Packet {
        match other {
            Esk::PublicKeyEncryptedSessionKey(k) => Packet::PublicKeyEncryptedSessionKey(k),
            Esk::SymKeyEncryptedSessionKey(k) => Packet::SymKeyEncryptedSessionKey(k),
        }
    }
}

/// Encrypted Data
/// Symmetrically Encrypted Data Packet |
/// Symmetrically Encrypted Integrity Protected Data Packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edata {
    SymEncryptedData(SymEncryptedData),
    SymEncryptedProtectedData(SymEncryptedProtectedData),
}

impl Serialize for Edata {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Edata::SymEncryptedData(d) => d.to_writer_with_header(writer),
            Edata::SymEncryptedProtectedData(d) => d.to_writer_with_header(writer),
        }
    }

    fn write_len(&self) -> usize {
        match self {
            Edata::SymEncryptedData(d) => d.write_len_with_header(),
            Edata::SymEncryptedProtectedData(d) => d.write_len_with_header(),
        }
    }
}

impl_try_from_into!(
    Edata,
    SymEncryptedData => SymEncryptedData,
    SymEncryptedProtectedData => SymEncryptedProtectedData
);

impl TryFrom<Packet> for Edata {
    type Error = Error;

    fn try_from(other: Packet) -> Result<Edata> {
        match other {
            Packet::SymEncryptedData(d) => Ok(Edata::SymEncryptedData(d)),
            Packet::SymEncryptedProtectedData(d) => Ok(Edata::SymEncryptedProtectedData(d)),
            _ => Err(format_err!("not a valid edata packet: {:?}", other.tag())),
        }
    }
}

impl From<Edata> for Packet {
    fn from(other: Edata) -> Packet {
        match other {
            Edata::SymEncryptedData(d) => Packet::SymEncryptedData(d),
            Edata::SymEncryptedProtectedData(d) => Packet::SymEncryptedProtectedData(d),
        }
    }
}

impl Edata {
    pub fn data(&self) -> &[u8] {
        match self {
            Edata::SymEncryptedData(d) => d.data(),
            Edata::SymEncryptedProtectedData(d) => d.data(),
        }
    }

    pub fn tag(&self) -> Tag {
        match self {
            Edata::SymEncryptedData(_) => Tag::SymEncryptedData,
            Edata::SymEncryptedProtectedData(_) => Tag::SymEncryptedProtectedData,
        }
    }

    pub fn is_integrity_protected(&self) -> bool {
        matches!(self, Edata::SymEncryptedProtectedData(_))
    }

    /// Encrypts `plaintext`, with a modification detection code if
    /// `integrity_protected` is set.
    pub fn encrypt_with_rng<R: CryptoRng + Rng>(
        rng: &mut R,
        registry: &AlgorithmRegistry,
        session_key: &PlainSessionKey,
        integrity_protected: bool,
        plaintext: &[u8],
    ) -> AsyncResult<Self> {
        if integrity_protected {
            SymEncryptedProtectedData::encrypt_with_rng(rng, registry, session_key, plaintext)
                .add_callback(|d| Ok(Edata::SymEncryptedProtectedData(d)))
        } else {
            SymEncryptedData::encrypt_with_rng(rng, registry, session_key, plaintext)
                .add_callback(|d| Ok(Edata::SymEncryptedData(d)))
        }
    }

    /// Decrypts the data and parses the plaintext as a message.
    pub fn decrypt(
        &self,
        registry: &AlgorithmRegistry,
        session_key: &PlainSessionKey,
    ) -> AsyncResult<Message> {
        let plaintext = match self {
            Edata::SymEncryptedData(d) => d.decrypt(registry, session_key),
            Edata::SymEncryptedProtectedData(d) => d.decrypt(registry, session_key),
        };
        plaintext.add_callback(Self::process_decrypted)
    }

    /// Transform decrypted data into a message.
    /// Bails if the packets contain no message or multiple messages.
    fn process_decrypted(packet_data: Vec<u8>) -> Result<Message> {
        Message::from_bytes(packet_data)
            .map_err(|err| format_err!("Invalid decrypted message: {}", err))
    }
}

impl Serialize for Message {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Message::Literal(data) => data.to_writer_with_header(writer),
            Message::Compressed(data) => data.to_writer_with_header(writer),
            Message::Signed {
                message,
                one_pass_signature,
                signature,
            } => {
                match one_pass_signature {
                    Some(ops) => {
                        ops.to_writer_with_header(writer)?;
                        message.to_writer(writer)?;
                        signature.to_writer_with_header(writer)?;
                    }
                    None => {
                        signature.to_writer_with_header(writer)?;
                        message.to_writer(writer)?;
                    }
                }

                Ok(())
            }
            Message::Encrypted { esk, edata } => {
                for e in esk {
                    e.to_writer(writer)?;
                }
                edata.to_writer(writer)?;

                Ok(())
            }
        }
    }

    fn write_len(&self) -> usize {
        match self {
            Message::Literal(data) => data.write_len_with_header(),
            Message::Compressed(data) => data.write_len_with_header(),
            Message::Signed {
                message,
                one_pass_signature,
                signature,
            } => {
                let mut sum = message.write_len() + signature.write_len_with_header();
                if let Some(ops) = one_pass_signature {
                    sum += ops.write_len_with_header();
                }
                sum
            }
            Message::Encrypted { esk, edata } => {
                esk.iter().map(Serialize::write_len).sum::<usize>() + edata.write_len()
            }
        }
    }
}

impl From<LiteralData> for Message {
    fn from(data: LiteralData) -> Self {
        Message::Literal(data)
    }
}

impl From<CompressedData> for Message {
    fn from(data: CompressedData) -> Self {
        Message::Compressed(data)
    }
}

impl Message {
    /// A literal message in text mode.
    pub fn new_literal(file_name: &str, data: &str) -> Result<Self> {
        LiteralData::from_str(file_name, data).map(Message::Literal)
    }

    /// A literal message in binary mode.
    pub fn new_literal_bytes(file_name: &str, data: impl Into<Bytes>) -> Result<Self> {
        LiteralData::from_bytes(file_name, data).map(Message::Literal)
    }

    /// Wraps `message` behind a one pass signature and its closing signature.
    pub fn new_one_pass_signed(
        message: Message,
        one_pass_signature: OnePassSignature,
        signature: Signature,
    ) -> Self {
        Message::Signed {
            message: Box::new(message),
            one_pass_signature: Some(one_pass_signature),
            signature,
        }
    }

    /// Compresses the serialized message into a new compressed message.
    pub fn compress(
        &self,
        registry: &AlgorithmRegistry,
        alg: CompressionAlgorithm,
    ) -> AsyncResult<Self> {
        let data = match self.to_bytes() {
            Ok(data) => data,
            Err(err) => return AsyncResult::err(err),
        };
        CompressedData::compress(registry, alg, &data).add_callback(|c| Ok(Message::Compressed(c)))
    }

    /// Decompresses one layer if compressed, other messages are returned as is.
    pub fn decompress(&self, registry: &AlgorithmRegistry) -> AsyncResult<Self> {
        match self {
            Message::Compressed(data) => data.decompress(registry).add_callback(parse_decompressed),
            _ => AsyncResult::ok(self.clone()),
        }
    }

    /// Encrypts the message under `session_key`, announcing it with `esk`.
    pub fn encrypt_with_session_key<R: CryptoRng + Rng>(
        &self,
        rng: &mut R,
        registry: &AlgorithmRegistry,
        esk: Vec<Esk>,
        session_key: &PlainSessionKey,
        integrity_protected: bool,
    ) -> AsyncResult<Self> {
        let data = match self.to_bytes() {
            Ok(data) => data,
            Err(err) => return AsyncResult::err(err),
        };
        Edata::encrypt_with_rng(rng, registry, session_key, integrity_protected, &data)
            .add_callback(move |edata| Ok(Message::Encrypted { esk, edata }))
    }

    /// Encrypts the message to a passphrase.
    ///
    /// The session key is derived from the passphrase directly, the message
    /// carries a single symmetric key encrypted session key without an
    /// encrypted key.
    pub fn encrypt_with_password<R: CryptoRng + Rng>(
        &self,
        rng: &mut R,
        registry: &AlgorithmRegistry,
        password: &Password,
        options: &MessageEncryptionOptions,
    ) -> AsyncResult<Self> {
        let (skesk, session_key) = match password_session_key(rng, registry, password, options) {
            Ok(prepared) => prepared,
            Err(err) => return AsyncResult::err(err),
        };
        self.encrypt_with_session_key(
            rng,
            registry,
            vec![Esk::SymKeyEncryptedSessionKey(skesk)],
            &session_key,
            options.integrity_protected(),
        )
    }

    /// Encrypts the message to the public `keys` under a fresh session key.
    ///
    /// Each key gets a public key encrypted session key, produced by the
    /// asymmetric cipher registered for its algorithm.
    pub fn encrypt_to_keys<R: CryptoRng + Rng, K: KeyDetails>(
        &self,
        rng: &mut R,
        registry: &AlgorithmRegistry,
        keys: &[K],
        options: &MessageEncryptionOptions,
    ) -> AsyncResult<Self> {
        if keys.is_empty() {
            return AsyncResult::err(format_err!("no keys to encrypt to"));
        }
        let session_key = PlainSessionKey::generate(&mut *rng, options.sym_alg());
        let esks = keys.iter().fold(AsyncResult::ok(Vec::new()), |acc, key| {
            let pkesk = PublicKeyEncryptedSessionKey::encrypt(registry, key, &session_key);
            acc.add_async_callback(move |mut esks: Vec<Esk>| {
                pkesk.add_callback(move |pkesk| {
                    esks.push(Esk::PublicKeyEncryptedSessionKey(pkesk));
                    Ok(esks)
                })
            })
        });

        let data = match self.to_bytes() {
            Ok(data) => data,
            Err(err) => return AsyncResult::err(err),
        };
        let edata = Edata::encrypt_with_rng(
            rng,
            registry,
            &session_key,
            options.integrity_protected(),
            &data,
        );
        esks.add_async_callback(move |esk| {
            edata.add_callback(move |edata| Ok(Message::Encrypted { esk, edata }))
        })
    }

    /// Decrypts the message with a secret key.
    ///
    /// Only public key encrypted session keys addressed to `key` are used.
    /// The first one, in order, that yields a message wins.
    pub fn decrypt_with_key(
        &self,
        registry: &AlgorithmRegistry,
        key: &impl SecretKeyTrait,
    ) -> AsyncResult<Self> {
        match self {
            Message::Compressed(_) | Message::Literal(_) => {
                AsyncResult::err(format_err!("not encrypted"))
            }
            Message::Signed { message, .. } => message.decrypt_with_key(registry, key),
            Message::Encrypted { esk, edata } => {
                let key_id = match key.key_id(registry) {
                    Ok(key_id) => key_id,
                    Err(err) => return AsyncResult::err(err),
                };
                let mut attempts = esk
                    .iter()
                    .filter_map(|esk| match esk {
                        Esk::PublicKeyEncryptedSessionKey(k) if k.id() == &key_id => Some(k),
                        _ => None,
                    })
                    .map(|pkesk| {
                        let registry = registry.clone();
                        let edata = edata.clone();
                        pkesk
                            .decrypt(&registry, key)
                            .add_async_callback(move |session_key| {
                                edata.decrypt(&registry, &session_key)
                            })
                    });
                let Some(first) = attempts.next() else {
                    return AsyncResult::err(format_err!("no session key for key {:?}", key_id));
                };
                debug!("decrypting with key {:?}", key_id);
                attempts.fold(first, |acc, next| {
                    acc.add_both(Ok).add_async_callback(move |outcome| match outcome {
                        Ok(message) => AsyncResult::ok(message),
                        Err(err) => {
                            debug!("session key did not decrypt the message: {}", err);
                            next
                        }
                    })
                })
            }
        }
    }

    /// Decrypts the message with a known session key.
    pub fn decrypt_with_session_key(
        &self,
        registry: &AlgorithmRegistry,
        session_key: &PlainSessionKey,
    ) -> AsyncResult<Self> {
        match self {
            Message::Encrypted { edata, .. } => edata.decrypt(registry, session_key),
            Message::Signed { message, .. } => {
                message.decrypt_with_session_key(registry, session_key)
            }
            _ => AsyncResult::err(format_err!("not encrypted")),
        }
    }

    /// Decrypts the message with a passphrase.
    ///
    /// Symmetric key encrypted session keys are tried in order, the first
    /// one that yields a message wins. If all of them fail, the error of
    /// the last attempt is returned.
    pub fn decrypt_with_password(
        &self,
        registry: &AlgorithmRegistry,
        password: &Password,
    ) -> AsyncResult<Self> {
        match self {
            Message::Compressed(_) | Message::Literal(_) => {
                AsyncResult::err(format_err!("not encrypted"))
            }
            Message::Signed { message, .. } => message.decrypt_with_password(registry, password),
            Message::Encrypted { esk, edata } => {
                let skesks: Vec<_> = esk
                    .iter()
                    .filter_map(|esk| match esk {
                        Esk::SymKeyEncryptedSessionKey(k) => Some(k.clone()),
                        Esk::PublicKeyEncryptedSessionKey(_) => None,
                    })
                    .collect();
                if skesks.is_empty() {
                    return AsyncResult::err(format_err!("message is not password protected"));
                }
                let Some(passphrase) = password.read_non_empty() else {
                    return AsyncResult::err(Error::MissingPassphrase);
                };
                debug!("trying {} password protected session keys", skesks.len());

                decrypt_with_skesks(
                    registry.clone(),
                    skesks.into_iter(),
                    passphrase,
                    edata.clone(),
                )
            }
        }
    }

    /// The data signatures on this message are computed over: the literal
    /// data, or the compressed bytes of a compressed message.
    pub fn bytes_to_sign(&self) -> Result<Vec<u8>> {
        match self {
            Message::Literal(data) => Ok(data.data().to_vec()),
            Message::Compressed(data) => Ok(data.compressed_data().to_vec()),
            Message::Signed { message, .. } => message.bytes_to_sign(),
            Message::Encrypted { .. } => self.to_bytes(),
        }
    }

    /// Signs the message with `key`. The signature packet precedes the signed data.
    pub fn sign(
        self,
        registry: &AlgorithmRegistry,
        key: &impl SecretKeyTrait,
        typ: SignatureType,
        created: u32,
    ) -> AsyncResult<Self> {
        let data = match self.bytes_to_sign() {
            Ok(data) => data,
            Err(err) => return AsyncResult::err(err),
        };
        Signature::sign(registry, key, typ, created, &data).add_callback(move |signature| {
            Ok(Message::Signed {
                message: Box::new(self),
                one_pass_signature: None,
                signature,
            })
        })
    }

    /// Signs the message with `key` in the one pass form.
    ///
    /// The one pass signature is marked nested if the message was already signed.
    pub fn sign_with_one_pass(
        self,
        registry: &AlgorithmRegistry,
        key: &impl SecretKeyTrait,
        typ: SignatureType,
        created: u32,
    ) -> AsyncResult<Self> {
        let prepared = self
            .bytes_to_sign()
            .and_then(|data| Ok((data, key.key_id(registry)?)));
        let (data, key_id) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => return AsyncResult::err(err),
        };
        let nested = matches!(self, Message::Signed { .. });
        Signature::sign(registry, key, typ, created, &data).add_callback(move |signature| {
            let one_pass_signature = OnePassSignature::new(
                signature.typ(),
                signature.hash_alg(),
                signature.pub_alg(),
                key_id,
                nested,
            );
            Ok(Message::new_one_pass_signed(self, one_pass_signature, signature))
        })
    }

    /// Verifies every signature of the message against the matching key in `keys`.
    ///
    /// Keys are matched by the issuer of each signature, signatures without a
    /// matching key are skipped.
    pub fn verify<K: KeyDetails>(
        &self,
        registry: &AlgorithmRegistry,
        keys: &[K],
    ) -> AsyncResult<VerifyResult> {
        let prepared = self.bytes_to_sign().and_then(|data| {
            let ids = keys
                .iter()
                .map(|key| key.key_id(registry))
                .collect::<Result<Vec<_>>>()?;
            Ok((data, ids))
        });
        let (data, ids) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => return AsyncResult::err(err),
        };

        self.signatures()
            .into_iter()
            .filter_map(|signature| {
                let issuer = signature.issuer()?;
                let index = ids.iter().position(|id| id == &issuer)?;
                Some((issuer, signature.verify(registry, &keys[index], &data)))
            })
            .fold(
                AsyncResult::ok(VerifyResult::default()),
                |acc, (issuer, verified)| {
                    acc.add_async_callback(move |mut result: VerifyResult| {
                        verified.add_callback(move |ok| {
                            if ok {
                                result.success.push(issuer);
                            } else {
                                result.failure.push(issuer);
                            }
                            Ok(result)
                        })
                    })
                },
            )
    }

    /// Check if this message is a signature, that was signed with a one pass signature.
    pub fn is_one_pass_signed(&self) -> bool {
        match self {
            Message::Signed {
                one_pass_signature, ..
            } => one_pass_signature.is_some(),
            _ => false,
        }
    }

    pub fn is_literal(&self) -> bool {
        match self {
            Message::Literal(_) => true,
            Message::Signed { message, .. } => message.is_literal(),
            _ => false,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        match self {
            Message::Encrypted { .. } => true,
            Message::Signed { message, .. } => message.is_encrypted(),
            _ => false,
        }
    }

    /// The literal data, if available without decompressing or decrypting.
    pub fn get_literal(&self) -> Option<&LiteralData> {
        match self {
            Message::Literal(data) => Some(data),
            Message::Signed { message, .. } => message.get_literal(),
            _ => None,
        }
    }

    /// All signatures on this level and nested signed levels, outermost first.
    pub fn signatures(&self) -> Vec<&Signature> {
        let mut out = Vec::new();
        let mut current = self;
        while let Message::Signed {
            message, signature, ..
        } = current
        {
            out.push(signature);
            current = message;
        }
        out
    }

    /// Unwraps signatures and up to [`MAX_NESTING_LEVEL`] compressed layers
    /// down to the literal data.
    ///
    /// Fails with [`Error::NestingTooDeep`] if more layers are found, and
    /// for encrypted messages.
    pub fn literal_message(&self, registry: &AlgorithmRegistry) -> AsyncResult<LiteralData> {
        literal_at_level(self.clone(), registry.clone(), 0)
    }

    /// Returns the underlying content, see [`literal_message`](Self::literal_message).
    pub fn get_content(&self, registry: &AlgorithmRegistry) -> AsyncResult<Vec<u8>> {
        self.literal_message(registry)
            .add_callback(|literal| Ok(literal.data().to_vec()))
    }
}

fn password_session_key<R: CryptoRng + Rng>(
    rng: &mut R,
    registry: &AlgorithmRegistry,
    password: &Password,
    options: &MessageEncryptionOptions,
) -> Result<(SymKeyEncryptedSessionKey, PlainSessionKey)> {
    let passphrase = password.read_non_empty().ok_or(Error::MissingPassphrase)?;
    let sym_alg = options.sym_alg();
    let s2k = StringToKey::new_iterated(rng, options.s2k_hash(), options.s2k_count());
    let key = s2k.derive_key(registry, &passphrase, sym_alg.key_size())?;
    let skesk = SymKeyEncryptedSessionKey::new(s2k, sym_alg)?;

    Ok((skesk, PlainSessionKey::new(sym_alg, key)))
}

fn parse_decompressed(data: Vec<u8>) -> Result<Message> {
    ensure!(!data.is_empty(), "Empty compressed block");
    Message::from_bytes(data)
}

fn literal_at_level(
    mut message: Message,
    registry: AlgorithmRegistry,
    level: usize,
) -> AsyncResult<LiteralData> {
    loop {
        match message {
            Message::Literal(data) => return AsyncResult::ok(data),
            Message::Signed { message: inner, .. } => message = *inner,
            Message::Compressed(data) => {
                if level >= MAX_NESTING_LEVEL {
                    return AsyncResult::err(Error::NestingTooDeep {
                        max: MAX_NESTING_LEVEL,
                    });
                }
                return data
                    .decompress(&registry)
                    .add_callback(parse_decompressed)
                    .add_async_callback(move |inner| literal_at_level(inner, registry, level + 1));
            }
            Message::Encrypted { .. } => {
                return AsyncResult::err(format_err!("message is encrypted"));
            }
        }
    }
}
