
use crate::{error::Error, traits::Model};
use derive_more::Display;
use std::{
    any::TypeId,
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{Arc, OnceLock, PoisonError, RwLock},
};

/// Annotation naming the primary key explicitly.
pub const ANNOTATION_ID: &str = "id";
/// Annotation registering a unique index.
pub const ANNOTATION_UNIQUE: &str = "unique";
/// Annotation registering a list index.
pub const ANNOTATION_INDEX: &str = "index";
/// Annotation flattening a nested struct into its parent.
pub const ANNOTATION_INLINE: &str = "inline";

/// Field name used as primary key when no field carries the `id` annotation.
pub const CONVENTIONAL_PRIMARY_KEY: &str = "id";

const INDEX_BUCKET_PREFIX: &str = "__burrow_index_";

///
/// FieldSpec
///
/// One entry of a type's static field description.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub annotation: Option<&'static str>,
    pub inline: Option<&'static [Self]>,
    pub public: bool,
}

impl FieldSpec {
    #[must_use]
    pub const fn new(name: &'static str, annotation: Option<&'static str>) -> Self {
        Self {
            name,
            annotation,
            inline: None,
            public: true,
        }
    }

    #[must_use]
    pub const fn inline(name: &'static str, fields: &'static [Self]) -> Self {
        Self {
            name,
            annotation: Some(ANNOTATION_INLINE),
            inline: Some(fields),
            public: true,
        }
    }

    #[must_use]
    pub const fn private(name: &'static str) -> Self {
        Self {
            name,
            annotation: None,
            inline: None,
            public: false,
        }
    }
}

///
/// IndexKind
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum IndexKind {
    #[display("unique")]
    Unique,
    #[display("list")]
    List,
}

///
/// ModelInfo
///
/// Primary key, indexes, and visible fields of one record type.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModelInfo {
    pub name: &'static str,
    pub primary_key: &'static str,
    pub indexes: BTreeMap<&'static str, IndexKind>,
    pub fields: BTreeSet<&'static str>,
}

impl ModelInfo {
    /// Resolve the info of `T`, cached by type identity.
    pub fn of<T: Model>() -> Result<Arc<Self>, Error> {
        static CACHE: OnceLock<RwLock<HashMap<TypeId, Arc<ModelInfo>>>> = OnceLock::new();

        let cache = CACHE.get_or_init(RwLock::default);
        let id = TypeId::of::<T>();

        if let Some(info) = cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return Ok(Arc::clone(info));
        }

        let info = Arc::new(Self::extract(T::NAME, T::FIELDS)?);
        cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&info));

        Ok(info)
    }

    /// Build the info from a field description without caching.
    pub fn extract(name: &'static str, fields: &'static [FieldSpec]) -> Result<Self, Error> {
        let mut builder = Builder::default();
        builder.walk(name, fields, false)?;

        let primary_key = builder
            .primary_key
            .ok_or(Error::NoPrimaryKeyField(name))?;

        Ok(Self {
            name,
            primary_key,
            indexes: builder.indexes,
            fields: builder.fields,
        })
    }

    #[must_use]
    pub fn index(&self, field: &str) -> Option<IndexKind> {
        self.indexes.get(field).copied()
    }

    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    #[must_use]
    pub fn is_primary_key(&self, field: &str) -> bool {
        self.primary_key == field
    }

    /// Name of the nested bucket holding the index on `field`.
    #[must_use]
    pub fn index_bucket(&self, field: &str) -> String {
        format!("{}/{INDEX_BUCKET_PREFIX}{field}", self.name)
    }

    /// Prefix shared by every index bucket of this model.
    #[must_use]
    pub fn index_bucket_prefix(&self) -> String {
        format!("{}/{INDEX_BUCKET_PREFIX}", self.name)
    }
}

///
/// Builder
///

#[derive(Default)]
struct Builder {
    primary_key: Option<&'static str>,
    explicit_key: bool,
    indexes: BTreeMap<&'static str, IndexKind>,
    fields: BTreeSet<&'static str>,
}

impl Builder {
    fn walk(
        &mut self,
        model: &'static str,
        fields: &'static [FieldSpec],
        child: bool,
    ) -> Result<(), Error> {
        for spec in fields.iter().filter(|spec| spec.public) {
            match spec.annotation {
                None => {}
                Some(ANNOTATION_ID) => {
                    if !child && !self.explicit_key {
                        self.primary_key = Some(spec.name);
                        self.explicit_key = true;
                    }
                }
                Some(ANNOTATION_UNIQUE) => self.register(spec.name, IndexKind::Unique, child),
                Some(ANNOTATION_INDEX) => self.register(spec.name, IndexKind::List, child),
                Some(ANNOTATION_INLINE) => {
                    let nested = spec.inline.ok_or(Error::NotAStruct {
                        model,
                        field: spec.name,
                    })?;
                    self.walk(model, nested, true)?;

                    continue;
                }
                Some(annotation) => {
                    return Err(Error::UnknownAnnotation {
                        model,
                        field: spec.name,
                        annotation,
                    });
                }
            }

            self.fields.insert(spec.name);

            if !child && self.primary_key.is_none() && spec.name == CONVENTIONAL_PRIMARY_KEY {
                self.primary_key = Some(spec.name);
            }
        }

        Ok(())
    }

    // children never override a registration made by their parent
    fn register(&mut self, field: &'static str, kind: IndexKind, child: bool) {
        if child {
            self.indexes.entry(field).or_insert(kind);
        } else {
            self.indexes.insert(field, kind);
        }
    }
}
