use crate::{
    db::{
        Db,
        engine::{Read, WriteTx},
        key::encode_key,
    },
    error::Error,
    serialize::Codec,
    traits::FieldValue,
};
use serde::{Serialize, de::DeserializeOwned};

///
/// KvBucket
///
/// Raw key/value access to one bucket. Keys follow the generation's key
/// encoding and values go through the codec.
///

#[derive(Clone, Debug)]
pub struct KvBucket<'a, C: Codec> {
    db: &'a Db<C>,
    name: String,
}

impl<'a, C: Codec> KvBucket<'a, C> {
    pub(crate) const fn new(db: &'a Db<C>, name: String) -> Self {
        Self { db, name }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stored bytes of a logical key.
    pub fn key_bytes(&self, key: &impl FieldValue) -> Result<Vec<u8>, Error> {
        Ok(encode_key(
            &key.to_value(),
            self.db.generation(),
            self.db.codec(),
        )?)
    }

    pub fn set<V>(&self, key: impl FieldValue, value: &V) -> Result<(), Error>
    where
        V: Serialize + ?Sized,
    {
        self.db.update(|tx| self.set_in(tx, &key, value))
    }

    pub fn set_in<V>(&self, tx: &WriteTx, key: &impl FieldValue, value: &V) -> Result<(), Error>
    where
        V: Serialize + ?Sized,
    {
        let key = self.key_bytes(key)?;
        let bytes = self.db.codec().encode(value)?;
        tx.create_bucket(&self.name)?;
        tx.put(&self.name, &key, &bytes)?;

        Ok(())
    }

    pub fn get<V: DeserializeOwned>(&self, key: impl FieldValue) -> Result<V, Error> {
        self.db.view(|tx| self.get_in(tx, &key))
    }

    pub fn get_in<V: DeserializeOwned>(
        &self,
        tx: &impl Read,
        key: &impl FieldValue,
    ) -> Result<V, Error> {
        let key = self.key_bytes(key)?;
        let bytes = tx.get(&self.name, &key)?.ok_or(Error::NotFound)?;

        Ok(self.db.codec().decode(&bytes)?)
    }

    /// Remove a key. `NotFound` when it is absent.
    pub fn delete(&self, key: impl FieldValue) -> Result<(), Error> {
        let key = self.key_bytes(&key)?;

        self.db.update(|tx| {
            if tx.delete(&self.name, &key)? {
                Ok(())
            } else {
                Err(Error::NotFound)
            }
        })
    }

    /// Every raw entry in key order.
    pub fn entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Error> {
        self.db.view(|tx| Ok(tx.entries(&self.name)?))
    }
}
