//! Standard security handler for the lopdf engine.
//!
//! lopdf 0.34 only decrypts top-level strings and streams plus the entries of
//! `/Info`, and only for RC4 revisions 2 and 3. This handler checks user and
//! owner passwords for revisions 2 to 6 (RC4, AES-128 and AES-256) and
//! decrypts every string of the document, including strings nested in
//! dictionaries and arrays, as well as stream contents.

use aes::cipher::block_padding::{NoPadding, Pkcs7};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};
use md5::{Digest, Md5};
use rc4::consts::{U10, U11, U12, U13, U14, U15, U16, U5, U6, U7, U8, U9};
use rc4::{KeyInit, Rc4, StreamCipher};
use sha2::{Sha256, Sha384, Sha512};

use super::lopdf_backend::{deref, deref_dict};
use crate::error::{Error, Result};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

/// Padding appended to passwords shorter than 32 bytes.
const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Revision 5 and 6 passwords are truncated to this many bytes.
const MAX_UTF8_PASSWORD: usize = 127;

/// Cipher applied to strings or streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptMethod {
    Identity,
    Rc4,
    Aes128,
    Aes256,
}

impl CryptMethod {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"None" | b"Identity" => Some(Self::Identity),
            b"V2" => Some(Self::Rc4),
            b"AESV2" => Some(Self::Aes128),
            b"AESV3" => Some(Self::Aes256),
            _ => None,
        }
    }
}

/// Parameters of a `/Filter /Standard` encryption dictionary.
#[derive(Debug, Clone)]
pub struct StandardSecurity {
    revision: i64,
    /// File key length in bytes.
    key_length: usize,
    owner: Vec<u8>,
    user: Vec<u8>,
    owner_key: Vec<u8>,
    user_key: Vec<u8>,
    permissions: i32,
    file_id: Vec<u8>,
    encrypt_metadata: bool,
    string_method: CryptMethod,
    stream_method: CryptMethod,
    dict_id: Option<ObjectId>,
}

impl StandardSecurity {
    /// Read the `/Encrypt` dictionary referenced by the trailer.
    pub fn from_document(doc: &LopdfDocument) -> Result<Self> {
        let unsupported = |what: &str| Error::UnsupportedEncryption(what.to_string());

        let entry = doc
            .trailer
            .get(b"Encrypt")
            .map_err(|_| Error::MissingObject("Encrypt".to_string()))?;
        let dict_id = entry.as_reference().ok();
        let dict = deref_dict(doc, entry).ok_or_else(|| unsupported("/Encrypt is not a dictionary"))?;

        let int = |key: &[u8]| {
            dict.get(key)
                .ok()
                .and_then(|o| deref(doc, o))
                .and_then(|o| o.as_i64().ok())
        };
        let bytes = |key: &[u8]| match dict.get(key).ok().and_then(|o| deref(doc, o)) {
            Some(Object::String(bytes, _)) => bytes.clone(),
            _ => Vec::new(),
        };

        let filter = dict
            .get(b"Filter")
            .ok()
            .and_then(|o| deref(doc, o))
            .and_then(|o| o.as_name().ok())
            .unwrap_or_default();
        if filter != b"Standard" {
            return Err(unsupported(&format!(
                "security handler {}",
                String::from_utf8_lossy(filter)
            )));
        }

        let version = int(b"V").unwrap_or(0);
        let revision = int(b"R").ok_or_else(|| unsupported("missing revision"))?;
        if !(2..=6).contains(&revision) {
            return Err(unsupported(&format!("revision {}", revision)));
        }

        let bits = |default: i64| int(b"Length").unwrap_or(default).clamp(40, 128) as usize;
        let key_length = match version {
            1 => 5,
            2 | 3 => bits(40) / 8,
            4 => bits(128) / 8,
            5 => 32,
            _ => return Err(unsupported(&format!("algorithm V{}", version))),
        };

        let (string_method, stream_method) = if version >= 4 {
            (
                crypt_filter(doc, dict, b"StrF")?,
                crypt_filter(doc, dict, b"StmF")?,
            )
        } else {
            (CryptMethod::Rc4, CryptMethod::Rc4)
        };

        let file_id = doc
            .trailer
            .get(b"ID")
            .ok()
            .and_then(|o| deref(doc, o))
            .and_then(|o| o.as_array().ok())
            .and_then(|ids| ids.first())
            .and_then(|o| o.as_str().ok())
            .map(<[u8]>::to_vec)
            .unwrap_or_default();

        let encrypt_metadata = dict
            .get(b"EncryptMetadata")
            .ok()
            .and_then(|o| o.as_bool().ok())
            .unwrap_or(true);

        Ok(Self {
            revision,
            key_length,
            owner: bytes(b"O"),
            user: bytes(b"U"),
            owner_key: bytes(b"OE"),
            user_key: bytes(b"UE"),
            // /P is a 32-bit field; some writers store it unsigned.
            permissions: int(b"P").unwrap_or(0) as i32,
            file_id,
            encrypt_metadata,
            string_method,
            stream_method,
            dict_id,
        })
    }

    pub fn revision(&self) -> i64 {
        self.revision
    }

    pub fn string_method(&self) -> CryptMethod {
        self.string_method
    }

    /// Compute the file key for `password`, trying it first as the user
    /// password and then as the owner password.
    pub fn authenticate(&self, password: &[u8]) -> Option<Vec<u8>> {
        if self.revision >= 5 {
            let password = &password[..password.len().min(MAX_UTF8_PASSWORD)];
            return self
                .user_key_aes256(password)
                .or_else(|| self.owner_key_aes256(password));
        }

        self.user_key_md5(password).or_else(|| {
            let user_password = self.user_password_from_owner(password)?;
            self.user_key_md5(&user_password)
        })
    }

    /// Decrypt all strings and streams of `doc` in place.
    pub fn decrypt_document(&self, doc: &mut LopdfDocument, key: &[u8]) {
        for (&id, object) in doc.objects.iter_mut() {
            if Some(id) == self.dict_id {
                continue;
            }

            if let Object::Stream(stream) = object {
                // Cross-reference streams are never encrypted.
                if stream.dict.type_is(b"XRef") {
                    continue;
                }
                self.decrypt_strings(key, id, &mut stream.dict);

                if stream.dict.type_is(b"Metadata") && !self.encrypt_metadata {
                    continue;
                }
                match self.decrypt_bytes(key, id, &stream.content, self.stream_method) {
                    Some(plain) => stream.set_content(plain),
                    None => log::warn!("stream {:?} could not be decrypted", id),
                }
                continue;
            }

            self.decrypt_object(key, id, object);
        }
    }

    fn decrypt_strings(&self, key: &[u8], id: ObjectId, dict: &mut Dictionary) {
        for (_, value) in dict.iter_mut() {
            self.decrypt_object(key, id, value);
        }
    }

    fn decrypt_object(&self, key: &[u8], id: ObjectId, object: &mut Object) {
        match object {
            Object::String(bytes, _) => {
                match self.decrypt_bytes(key, id, bytes, self.string_method) {
                    Some(plain) => *bytes = plain,
                    None => log::warn!("string in object {:?} could not be decrypted", id),
                }
            }
            Object::Array(items) => {
                for item in items.iter_mut() {
                    self.decrypt_object(key, id, item);
                }
            }
            Object::Dictionary(dict) => self.decrypt_strings(key, id, dict),
            Object::Stream(stream) => self.decrypt_strings(key, id, &mut stream.dict),
            _ => {}
        }
    }

    /// Decrypt the bytes of a string or stream belonging to object `id`.
    pub fn decrypt_bytes(
        &self,
        key: &[u8],
        id: ObjectId,
        data: &[u8],
        method: CryptMethod,
    ) -> Option<Vec<u8>> {
        match method {
            CryptMethod::Identity => Some(data.to_vec()),
            CryptMethod::Rc4 => rc4(&object_key(key, id, false), data),
            CryptMethod::Aes128 => aes_cbc_decrypt(&object_key(key, id, true), data),
            CryptMethod::Aes256 => aes_cbc_decrypt(key, data),
        }
    }

    /// File key derived from a user password (revisions 2 to 4).
    fn file_key(&self, password: &[u8]) -> Vec<u8> {
        let mut hasher = Md5::default();
        hasher.update(pad_password(password));
        hasher.update(&self.owner[..self.owner.len().min(32)]);
        hasher.update(self.permissions.to_le_bytes());
        hasher.update(&self.file_id);
        if self.revision >= 4 && !self.encrypt_metadata {
            hasher.update([0xFF; 4]);
        }

        let n = self.key_length;
        let mut key = hasher.finalize().to_vec();
        if self.revision >= 3 {
            for _ in 0..50 {
                key = Md5::digest(&key[..n]).to_vec();
            }
        }
        key.truncate(n);
        key
    }

    /// The file key if `password` is the user password (revisions 2 to 4).
    fn user_key_md5(&self, password: &[u8]) -> Option<Vec<u8>> {
        let key = self.file_key(password);

        let (expected, significant) = if self.revision == 2 {
            (rc4(&key, &PASSWORD_PAD)?, 32)
        } else {
            let mut hasher = Md5::default();
            hasher.update(PASSWORD_PAD);
            hasher.update(&self.file_id);
            let mut hash = hasher.finalize().to_vec();
            for round in 0..20u8 {
                hash = rc4(&xor_key(&key, round), &hash)?;
            }
            (hash, 16)
        };

        let matches = self.user.len() >= significant
            && expected.len() >= significant
            && self.user[..significant] == expected[..significant];
        matches.then_some(key)
    }

    /// Recover the padded user password from an owner password by
    /// decrypting `/O` (revisions 2 to 4).
    fn user_password_from_owner(&self, owner_password: &[u8]) -> Option<Vec<u8>> {
        let mut hash = Md5::digest(pad_password(owner_password)).to_vec();
        if self.revision >= 3 {
            for _ in 0..50 {
                hash = Md5::digest(&hash).to_vec();
            }
        }
        let key = &hash[..self.key_length.min(hash.len())];
        let owner = &self.owner[..self.owner.len().min(32)];

        if self.revision == 2 {
            return rc4(key, owner);
        }

        let mut data = owner.to_vec();
        for round in (0..20u8).rev() {
            data = rc4(&xor_key(key, round), &data)?;
        }
        Some(data)
    }

    /// The file key if `password` is the user password (revisions 5 and 6).
    fn user_key_aes256(&self, password: &[u8]) -> Option<Vec<u8>> {
        let (hash, validation_salt, key_salt) = split_password_entry(&self.user)?;
        if self.hash_password(password, validation_salt, &[])? != hash {
            return None;
        }
        let intermediate = self.hash_password(password, key_salt, &[])?;
        aes256_unwrap_key(&intermediate, &self.user_key)
    }

    /// The file key if `password` is the owner password (revisions 5 and 6).
    fn owner_key_aes256(&self, password: &[u8]) -> Option<Vec<u8>> {
        let user = self.user.get(..48)?;
        let (hash, validation_salt, key_salt) = split_password_entry(&self.owner)?;
        if self.hash_password(password, validation_salt, user)? != hash {
            return None;
        }
        let intermediate = self.hash_password(password, key_salt, user)?;
        aes256_unwrap_key(&intermediate, &self.owner_key)
    }

    /// Password hash for revisions 5 and 6. Revision 5 uses the plain
    /// SHA-256; revision 6 runs the iterated AES/SHA-2 rounds.
    fn hash_password(&self, password: &[u8], salt: &[u8], user: &[u8]) -> Option<Vec<u8>> {
        let mut k = Sha256::default()
            .chain_update(password)
            .chain_update(salt)
            .chain_update(user)
            .finalize()
            .to_vec();
        if self.revision == 5 {
            return Some(k);
        }

        let mut round = 0usize;
        loop {
            let mut data = [password, &k[..], user].concat().repeat(64);
            let len = data.len();
            let cipher = Aes128CbcEnc::new_from_slices(&k[..16], &k[16..32]).ok()?;
            let e = cipher
                .encrypt_padded_mut::<NoPadding>(&mut data, len)
                .ok()?;

            // The first 16 bytes of E as a big-endian number, modulo 3.
            let selector = e[..16].iter().map(|&b| u32::from(b)).sum::<u32>() % 3;
            let last = usize::from(e[e.len() - 1]);
            k = match selector {
                0 => Sha256::digest(&*e).to_vec(),
                1 => Sha384::digest(&*e).to_vec(),
                _ => Sha512::digest(&*e).to_vec(),
            };

            round += 1;
            if round >= 64 && last + 32 <= round {
                break;
            }
        }

        k.truncate(32);
        Some(k)
    }
}

/// Cipher named by `/StrF` or `/StmF` through the `/CF` dictionary.
fn crypt_filter(doc: &LopdfDocument, dict: &Dictionary, key: &[u8]) -> Result<CryptMethod> {
    let name = match dict.get(key).ok().and_then(|o| deref(doc, o)) {
        Some(Object::Name(name)) => name.as_slice(),
        _ => return Ok(CryptMethod::Identity),
    };
    if name == b"Identity" {
        return Ok(CryptMethod::Identity);
    }

    let method = dict
        .get(b"CF")
        .ok()
        .and_then(|o| deref_dict(doc, o))
        .and_then(|cf| cf.get(name).ok())
        .and_then(|o| deref_dict(doc, o))
        .and_then(|filter| filter.get(b"CFM").ok())
        .and_then(|o| deref(doc, o))
        .and_then(|o| o.as_name().ok());

    match method {
        Some(cfm) => CryptMethod::from_name(cfm).ok_or_else(|| {
            Error::UnsupportedEncryption(format!("crypt method {}", String::from_utf8_lossy(cfm)))
        }),
        // A filter without /CFM does not transform data.
        None => Ok(CryptMethod::Identity),
    }
}

fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = PASSWORD_PAD;
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PASSWORD_PAD[..32 - len]);
    padded
}

fn xor_key(key: &[u8], round: u8) -> Vec<u8> {
    key.iter().map(|b| b ^ round).collect()
}

/// Key for one object: the file key extended with the object number and
/// generation, hashed with MD5.
fn object_key(file_key: &[u8], (number, generation): ObjectId, aes: bool) -> Vec<u8> {
    let mut hasher = Md5::default();
    hasher.update(file_key);
    hasher.update(&number.to_le_bytes()[..3]);
    hasher.update(&generation.to_le_bytes()[..2]);
    if aes {
        hasher.update(b"sAlT");
    }
    let digest = hasher.finalize();
    digest[..(file_key.len() + 5).min(16)].to_vec()
}

/// Hash, validation salt and key salt of a 48-byte `/U` or `/O` entry.
fn split_password_entry(entry: &[u8]) -> Option<(&[u8], &[u8], &[u8])> {
    let entry = entry.get(..48)?;
    Some((&entry[..32], &entry[32..40], &entry[40..48]))
}

/// RC4 with a 5 to 16 byte key.
fn rc4(key: &[u8], data: &[u8]) -> Option<Vec<u8>> {
    let mut out = data.to_vec();

    macro_rules! apply {
        ($($len:literal => $size:ty),+ $(,)?) => {
            match key.len() {
                $($len => Rc4::<$size>::new_from_slice(key).ok()?.apply_keystream(&mut out),)+
                _ => return None,
            }
        };
    }
    apply!(
        5 => U5, 6 => U6, 7 => U7, 8 => U8, 9 => U9, 10 => U10,
        11 => U11, 12 => U12, 13 => U13, 14 => U14, 15 => U15, 16 => U16,
    );

    Some(out)
}

/// AES-CBC with the IV in the first 16 bytes and PKCS#7 padding.
fn aes_cbc_decrypt(key: &[u8], data: &[u8]) -> Option<Vec<u8>> {
    if data.len() <= 16 {
        // Only an IV (or nothing): an empty string.
        return Some(Vec::new());
    }
    let (iv, body) = data.split_at(16);
    let mut buf = body.to_vec();

    let len = match key.len() {
        16 => Aes128CbcDec::new_from_slices(key, iv)
            .ok()?
            .decrypt_padded_mut::<Pkcs7>(&mut buf)
            .ok()?
            .len(),
        32 => Aes256CbcDec::new_from_slices(key, iv)
            .ok()?
            .decrypt_padded_mut::<Pkcs7>(&mut buf)
            .ok()?
            .len(),
        _ => return None,
    };
    buf.truncate(len);
    Some(buf)
}

/// Decrypt the 32-byte `/UE` or `/OE` entry with a zero IV.
fn aes256_unwrap_key(key: &[u8], wrapped: &[u8]) -> Option<Vec<u8>> {
    let mut buf = wrapped.get(..32)?.to_vec();
    Aes256CbcDec::new_from_slices(key, &[0u8; 16])
        .ok()?
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .ok()?;
    Some(buf)
}
