//! Engine-neutral PDF object values.
//!
//! Backends hand out copies of their objects in this form so the document
//! facade never touches engine types. Indirect references stay unresolved;
//! use [`PdfBackend::resolve_indirect`](super::PdfBackend::resolve_indirect)
//! to follow them.

/// Object identifier: (object number, generation number).
pub type ObjectId = (u32, u16);

/// A PDF object.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PdfObject {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    String(Vec<u8>),
    Array(Vec<PdfObject>),
    Dictionary(PdfDict),
    /// A stream; only its dictionary is carried.
    Stream(PdfDict),
    Reference(ObjectId),
}

impl PdfObject {
    pub fn is_null(&self) -> bool {
        matches!(self, PdfObject::Null)
    }

    pub fn is_name(&self) -> bool {
        matches!(self, PdfObject::Name(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, PdfObject::String(_))
    }

    pub fn is_indirect(&self) -> bool {
        matches!(self, PdfObject::Reference(_))
    }

    pub fn as_name(&self) -> Option<&[u8]> {
        match self {
            PdfObject::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_string_bytes(&self) -> Option<&[u8]> {
        match self {
            PdfObject::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PdfObject::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer or real as `f32`.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            PdfObject::Integer(i) => Some(*i as f32),
            PdfObject::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PdfObject]> {
        match self {
            PdfObject::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Dictionary of a dictionary or stream object.
    pub fn as_dict(&self) -> Option<&PdfDict> {
        match self {
            PdfObject::Dictionary(dict) | PdfObject::Stream(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            PdfObject::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// Number of elements of an array; 0 for anything else.
    pub fn array_len(&self) -> usize {
        self.as_array().map_or(0, <[PdfObject]>::len)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PdfObject::Null => "null",
            PdfObject::Boolean(_) => "boolean",
            PdfObject::Integer(_) => "integer",
            PdfObject::Real(_) => "real",
            PdfObject::Name(_) => "name",
            PdfObject::String(_) => "string",
            PdfObject::Array(_) => "array",
            PdfObject::Dictionary(_) => "dictionary",
            PdfObject::Stream(_) => "stream",
            PdfObject::Reference(_) => "reference",
        }
    }
}

/// A PDF dictionary, preserving the engine's key order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfDict {
    entries: Vec<(PdfObject, PdfObject)>,
}

impl PdfDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry keyed by name.
    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: PdfObject) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| k.as_name() == Some(&key[..])) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((PdfObject::Name(key), value)),
        }
    }

    /// Append an entry with an arbitrary key object.
    ///
    /// Engines that do not guarantee name keys use this; lookups by name skip
    /// such entries.
    pub fn push_raw(&mut self, key: PdfObject, value: PdfObject) {
        self.entries.push((key, value));
    }

    /// Look up the value stored under a name key.
    pub fn get(&self, key: &[u8]) -> Option<&PdfObject> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_name() == Some(key))
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key object at position `index`.
    pub fn key_at(&self, index: usize) -> Option<&PdfObject> {
        self.entries.get(index).map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PdfObject, &PdfObject)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl<K: Into<Vec<u8>>> FromIterator<(K, PdfObject)> for PdfDict {
    fn from_iter<I: IntoIterator<Item = (K, PdfObject)>>(iter: I) -> Self {
        let mut dict = PdfDict::new();
        for (key, value) in iter {
            dict.set(key, value);
        }
        dict
    }
}
