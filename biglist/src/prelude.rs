pub use crate::{
    biglist::{BigList, Seek},
    builder::{CustomBuilder, NoAggregate},
    cache::CachePolicy,
    config::{BigListConfig, Profile, StoreConfig},
    error::{BigListError, Result},
    height::{HeightList, HeightRecord},
    range::{Range, RangeList},
    store::{ContentStore, DiskStore, MemoryStore},
};
pub use libcompression::{CompressionConfig, CompressionType};
