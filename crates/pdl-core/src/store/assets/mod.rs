//! Asset CRUD on `AssetStore`, split into read and write halves.

mod read;
mod write;
