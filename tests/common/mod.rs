//! PDF fixtures written with lopdf for the integration tests.

#![allow(dead_code)]

pub mod logger;

use std::path::PathBuf;

use aes::cipher::block_padding::{NoPadding, Pkcs7};
use aes::cipher::{BlockEncryptMut, KeyIvInit};
use lopdf::{dictionary, Dictionary, Document as LopdfDocument, Object, ObjectId, StringFormat};
use md5::{Digest, Md5};
use rc4::consts::{U10, U16, U5};
use rc4::{KeyInit, Rc4, StreamCipher};
use sha2::Sha256;
use tempfile::TempDir;

/// Write fixture bytes into a temporary directory and return the file path.
pub fn write_pdf(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, data).unwrap();
    path
}

fn save(mut doc: LopdfDocument) -> Vec<u8> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Add a page tree with `count` US Letter pages; returns (pages id, page ids).
fn add_pages(doc: &mut LopdfDocument, count: usize) -> (ObjectId, Vec<ObjectId>) {
    let pages_id = doc.new_object_id();
    let page_ids: Vec<ObjectId> = (0..count)
        .map(|_| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
            })
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|&id| id.into()).collect::<Vec<Object>>(),
            "Count" => count as i64,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    (pages_id, page_ids)
}

fn add_catalog(doc: &mut LopdfDocument, mut catalog: Dictionary) -> ObjectId {
    catalog.set("Type", "Catalog");
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", catalog_id);
    catalog_id
}

/// A PDF 1.5 file with `pages` pages and nothing else.
pub fn plain_pdf(pages: usize) -> Vec<u8> {
    let mut doc = LopdfDocument::with_version("1.5");
    let (pages_id, _) = add_pages(&mut doc, pages);
    add_catalog(&mut doc, dictionary! { "Pages" => pages_id });
    save(doc)
}

/// One outline item: title, destination and children.
pub struct Item {
    pub title: &'static str,
    pub target: Target,
    pub open: bool,
    pub children: Vec<Item>,
}

pub enum Target {
    Page(usize),
    Uri(&'static str),
    Named(&'static str),
    None,
}

impl Item {
    pub fn new(title: &'static str, target: Target) -> Self {
        Self {
            title,
            target,
            open: false,
            children: Vec::new(),
        }
    }

    pub fn open(mut self) -> Self {
        self.open = true;
        self
    }

    pub fn child(mut self, child: Item) -> Self {
        self.children.push(child);
        self
    }
}

/// Write a sibling chain of outline items under `parent`; returns the ids of
/// the written items.
fn add_outline_items(
    doc: &mut LopdfDocument,
    parent: ObjectId,
    items: &[Item],
    page_ids: &[ObjectId],
) -> Vec<ObjectId> {
    let ids: Vec<ObjectId> = items.iter().map(|_| doc.new_object_id()).collect();

    for (i, item) in items.iter().enumerate() {
        let mut dict = dictionary! {
            "Title" => Object::string_literal(item.title),
            "Parent" => parent,
        };
        match item.target {
            Target::Page(index) => {
                dict.set("Dest", vec![page_ids[index].into(), "Fit".into()]);
            }
            Target::Uri(uri) => {
                dict.set(
                    "A",
                    dictionary! { "S" => "URI", "URI" => Object::string_literal(uri) },
                );
            }
            Target::Named(name) => {
                dict.set("Dest", Object::Name(name.as_bytes().to_vec()));
            }
            Target::None => {}
        }
        if i > 0 {
            dict.set("Prev", ids[i - 1]);
        }
        if i + 1 < ids.len() {
            dict.set("Next", ids[i + 1]);
        }

        let child_ids = add_outline_items(doc, ids[i], &item.children, page_ids);
        if let (Some(&first), Some(&last)) = (child_ids.first(), child_ids.last()) {
            let count = child_ids.len() as i64;
            dict.set("First", first);
            dict.set("Last", last);
            dict.set("Count", if item.open { count } else { -count });
        }

        doc.objects.insert(ids[i], Object::Dictionary(dict));
    }

    ids
}

fn add_outline(doc: &mut LopdfDocument, items: &[Item], page_ids: &[ObjectId]) -> ObjectId {
    let outlines_id = doc.new_object_id();
    let ids = add_outline_items(doc, outlines_id, items, page_ids);
    doc.objects.insert(
        outlines_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => ids[0],
            "Last" => ids[ids.len() - 1],
            "Count" => ids.len() as i64,
        }),
    );
    outlines_id
}

/// The outline of [`sample_pdf`]:
///
/// ```text
/// Chapter 1            (page 1, open)
///   Section 1.1        (page 2)
///     Detail 1.1.1     (page 2)
///   Section 1.2        (https://example.com/spec)
/// Chapter 2            (page 3)
/// Glossary             (named destination "gloss", undefined)
/// ```
pub fn sample_outline() -> Vec<Item> {
    vec![
        Item::new("Chapter 1", Target::Page(0))
            .open()
            .child(
                Item::new("Section 1.1", Target::Page(1))
                    .child(Item::new("Detail 1.1.1", Target::Page(1))),
            )
            .child(Item::new(
                "Section 1.2",
                Target::Uri("https://example.com/spec"),
            )),
        Item::new("Chapter 2", Target::Page(2)),
        Item::new("Glossary", Target::Named("gloss")),
    ]
}

/// A PDF 1.7 file with three pages, `/PageMode /UseOutlines`, a populated
/// info dictionary and the outline from [`sample_outline`].
///
/// Info entries: `Title` (literal), `Author` (UTF-16BE "Jörg"), `Producer`
/// (indirect string), `CreationDate`, and `Trapped` (a name, not a string).
pub fn sample_pdf() -> Vec<u8> {
    let mut doc = LopdfDocument::with_version("1.7");
    let (pages_id, page_ids) = add_pages(&mut doc, 3);
    let outlines_id = add_outline(&mut doc, &sample_outline(), &page_ids);

    let producer_id = doc.add_object(Object::string_literal("pdfdoc fixtures"));
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Sample Document"),
        "Author" => Object::String(
            vec![0xFE, 0xFF, 0x00, b'J', 0x00, 0xF6, 0x00, b'r', 0x00, b'g'],
            StringFormat::Hexadecimal,
        ),
        "Producer" => producer_id,
        "CreationDate" => Object::string_literal("D:20240115103045Z"),
        "Trapped" => "False",
    });
    doc.trailer.set("Info", info_id);

    add_catalog(
        &mut doc,
        dictionary! {
            "Pages" => pages_id,
            "Outlines" => outlines_id,
            "PageMode" => "UseOutlines",
        },
    );
    save(doc)
}

/// User password of the encrypted fixtures.
pub const USER_PASSWORD: &str = "secret";

/// Owner password of the encrypted fixtures.
pub const OWNER_PASSWORD: &str = "owner";

/// Cipher used by an encrypted fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cipher {
    /// V1 R2, 40-bit RC4.
    Rc4,
    /// V4 R4, AESV2 crypt filter with a 128-bit key.
    Aes128,
    /// V5 R5, AESV3 crypt filter with a 256-bit key.
    Aes256,
}

/// A PDF 1.4 file with two pages, an info `Title` of "Secret Title" and a
/// one-item outline, encrypted with the standard security handler (V1 R2,
/// 40-bit RC4) and user password [`USER_PASSWORD`].
pub fn encrypted_pdf() -> Vec<u8> {
    encrypted_pdf_with(Cipher::Rc4)
}

/// The content of [`encrypted_pdf`], encrypted with `cipher`. The outline
/// item "Locked Chapter" points at page 2 and a second item links to
/// `https://example.com/locked`.
pub fn encrypted_pdf_with(cipher: Cipher) -> Vec<u8> {
    let mut doc = LopdfDocument::with_version(match cipher {
        Cipher::Rc4 => "1.4",
        Cipher::Aes128 => "1.6",
        Cipher::Aes256 => "1.7",
    });
    let (pages_id, page_ids) = add_pages(&mut doc, 2);
    let outlines_id = add_outline(
        &mut doc,
        &[
            Item::new("Locked Chapter", Target::Page(1)),
            Item::new("Locked Link", Target::Uri("https://example.com/locked")),
        ],
        &page_ids,
    );
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Secret Title"),
    });
    doc.trailer.set("Info", info_id);
    add_catalog(
        &mut doc,
        dictionary! { "Pages" => pages_id, "Outlines" => outlines_id },
    );

    let file_id = b"pdfdoc-fixture-1".to_vec();
    let permissions: i32 = -44;
    let user = USER_PASSWORD.as_bytes();
    let owner = OWNER_PASSWORD.as_bytes();

    let encrypt = match cipher {
        Cipher::Rc4 => {
            let owner_entry = md5_owner_entry(owner, user, 2, 5);
            let key = md5_file_key(user, &owner_entry, permissions, &file_id, 2, 5);
            let user_entry = rc4(&key, &PASSWORD_PAD);
            encrypt_all(&mut doc, |id, data| rc4(&object_key(&key, id, false), data));

            dictionary! {
                "Filter" => "Standard",
                "V" => 1,
                "R" => 2,
                "Length" => 40,
                "O" => Object::String(owner_entry, StringFormat::Hexadecimal),
                "U" => Object::String(user_entry, StringFormat::Hexadecimal),
                "P" => permissions as i64,
            }
        }
        Cipher::Aes128 => {
            let owner_entry = md5_owner_entry(owner, user, 4, 16);
            let key = md5_file_key(user, &owner_entry, permissions, &file_id, 4, 16);
            let user_entry = md5_user_entry(&key, &file_id);
            encrypt_all(&mut doc, |id, data| {
                aes_encrypt(&object_key(&key, id, true), data)
            });

            dictionary! {
                "Filter" => "Standard",
                "V" => 4,
                "R" => 4,
                "Length" => 128,
                "CF" => dictionary! {
                    "StdCF" => dictionary! {
                        "CFM" => "AESV2",
                        "AuthEvent" => "DocOpen",
                        "Length" => 16,
                    },
                },
                "StmF" => "StdCF",
                "StrF" => "StdCF",
                "O" => Object::String(owner_entry, StringFormat::Hexadecimal),
                "U" => Object::String(user_entry, StringFormat::Hexadecimal),
                "P" => permissions as i64,
            }
        }
        Cipher::Aes256 => {
            let key = [0x3Cu8; 32];
            let mut user_entry = sha256(&[user, b"uvalsalt"]);
            user_entry.extend_from_slice(b"uvalsaltukeysalt");
            let user_key = aes256_wrap(&sha256(&[user, b"ukeysalt"]), &key);

            let mut owner_entry = sha256(&[owner, b"ovalsalt", &user_entry]);
            owner_entry.extend_from_slice(b"ovalsaltokeysalt");
            let owner_key = aes256_wrap(&sha256(&[owner, b"okeysalt", &user_entry]), &key);

            encrypt_all(&mut doc, |_, data| aes_encrypt(&key, data));

            dictionary! {
                "Filter" => "Standard",
                "V" => 5,
                "R" => 5,
                "Length" => 256,
                "CF" => dictionary! {
                    "StdCF" => dictionary! {
                        "CFM" => "AESV3",
                        "AuthEvent" => "DocOpen",
                        "Length" => 32,
                    },
                },
                "StmF" => "StdCF",
                "StrF" => "StdCF",
                "O" => Object::String(owner_entry, StringFormat::Hexadecimal),
                "U" => Object::String(user_entry, StringFormat::Hexadecimal),
                "OE" => Object::String(owner_key, StringFormat::Hexadecimal),
                "UE" => Object::String(user_key, StringFormat::Hexadecimal),
                "P" => permissions as i64,
            }
        }
    };

    let encrypt_id = doc.add_object(encrypt);
    doc.trailer.set("Encrypt", encrypt_id);
    doc.trailer.set(
        "ID",
        vec![
            Object::String(file_id.clone(), StringFormat::Hexadecimal),
            Object::String(file_id, StringFormat::Hexadecimal),
        ],
    );
    save(doc)
}

const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01,
    0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53,
    0x69, 0x7A,
];

fn pad_password(password: &[u8]) -> Vec<u8> {
    password
        .iter()
        .chain(PASSWORD_PAD.iter())
        .take(32)
        .copied()
        .collect()
}

fn md5(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = Md5::default();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

fn sha256(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = Sha256::default();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    match key.len() {
        5 => Rc4::<U5>::new_from_slice(key).unwrap().apply_keystream(&mut out),
        10 => Rc4::<U10>::new_from_slice(key).unwrap().apply_keystream(&mut out),
        16 => Rc4::<U16>::new_from_slice(key).unwrap().apply_keystream(&mut out),
        n => panic!("no fixture uses {}-byte RC4 keys", n),
    }
    out
}

fn xor_key(key: &[u8], round: u8) -> Vec<u8> {
    key.iter().map(|b| b ^ round).collect()
}

/// The `/O` entry for revisions 2 to 4.
fn md5_owner_entry(owner: &[u8], user: &[u8], revision: i64, key_len: usize) -> Vec<u8> {
    let mut hash = md5(&[&pad_password(owner)]);
    if revision >= 3 {
        for _ in 0..50 {
            hash = md5(&[&hash]);
        }
    }
    let key = &hash[..key_len];

    let mut entry = rc4(key, &pad_password(user));
    if revision >= 3 {
        for round in 1..20u8 {
            entry = rc4(&xor_key(key, round), &entry);
        }
    }
    entry
}

/// The file key for revisions 2 to 4.
fn md5_file_key(
    user: &[u8],
    owner_entry: &[u8],
    permissions: i32,
    file_id: &[u8],
    revision: i64,
    key_len: usize,
) -> Vec<u8> {
    let mut key = md5(&[
        &pad_password(user),
        owner_entry,
        &permissions.to_le_bytes(),
        file_id,
    ]);
    if revision >= 3 {
        for _ in 0..50 {
            key = md5(&[&key[..key_len]]);
        }
    }
    key.truncate(key_len);
    key
}

/// The `/U` entry for revisions 3 and 4.
fn md5_user_entry(key: &[u8], file_id: &[u8]) -> Vec<u8> {
    let mut entry = md5(&[&PASSWORD_PAD, file_id]);
    for round in 0..20u8 {
        entry = rc4(&xor_key(key, round), &entry);
    }
    entry.extend_from_slice(&[0u8; 16]);
    entry
}

fn object_key(file_key: &[u8], (num, generation): ObjectId, aes: bool) -> Vec<u8> {
    let salt: &[u8] = if aes { b"sAlT" } else { b"" };
    let digest = md5(&[
        file_key,
        &num.to_le_bytes()[..3],
        &generation.to_le_bytes()[..2],
        salt,
    ]);
    digest[..(file_key.len() + 5).min(16)].to_vec()
}

/// AES-CBC with PKCS#7 padding and a fixed IV written in front.
fn aes_encrypt(key: &[u8], data: &[u8]) -> Vec<u8> {
    let iv = [0xA5u8; 16];
    let len = data.len();
    let mut buf = data.to_vec();
    buf.resize(len + 16 - len % 16, 0);

    let encrypted = match key.len() {
        16 => cbc::Encryptor::<aes::Aes128>::new_from_slices(key, &iv)
            .unwrap()
            .encrypt_padded_mut::<Pkcs7>(&mut buf, len)
            .unwrap()
            .to_vec(),
        32 => cbc::Encryptor::<aes::Aes256>::new_from_slices(key, &iv)
            .unwrap()
            .encrypt_padded_mut::<Pkcs7>(&mut buf, len)
            .unwrap()
            .to_vec(),
        n => panic!("no fixture uses {}-byte AES keys", n),
    };
    [&iv[..], &encrypted].concat()
}

/// AES-256-CBC without padding and a zero IV, for `/UE` and `/OE`.
fn aes256_wrap(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut buf = data.to_vec();
    let len = buf.len();
    cbc::Encryptor::<aes::Aes256>::new_from_slices(key, &[0u8; 16])
        .unwrap()
        .encrypt_padded_mut::<NoPadding>(&mut buf, len)
        .unwrap()
        .to_vec()
}

/// Encrypt every string in every object with `encrypt(object id, bytes)`.
fn encrypt_all(doc: &mut LopdfDocument, encrypt: impl Fn(ObjectId, &[u8]) -> Vec<u8>) {
    for (&id, object) in doc.objects.iter_mut() {
        encrypt_strings(object, &|data| encrypt(id, data));
    }
}

fn encrypt_strings(object: &mut Object, encrypt: &dyn Fn(&[u8]) -> Vec<u8>) {
    match object {
        Object::String(bytes, format) => {
            *bytes = encrypt(bytes);
            *format = StringFormat::Hexadecimal;
        }
        Object::Array(items) => items
            .iter_mut()
            .for_each(|item| encrypt_strings(item, encrypt)),
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                encrypt_strings(value, encrypt);
            }
        }
        _ => {}
    }
}
