use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use libcompression::CompressionConfig;

use crate::{
    cache::{CachePolicy, MIN_CACHE_LIMIT},
    error::{BigListError, Result},
};

pub const DEFAULT_BLOCK_SIZE: usize = 32768;
pub const MIN_BLOCK_SIZE: usize = 2;
pub const DEFAULT_BALANCE_FACTOR: usize = 6;
pub const MIN_BALANCE_FACTOR: usize = 3;
pub const DEFAULT_CACHE_LIMIT: usize = 128;
pub const DEFAULT_PAGE_SIZE: u64 = 16384;

/// Tree shape parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BigListConfig
{
    /// Items per leaf
    pub block_size: usize,
    /// Depth slack tolerated before a rebalance
    pub balance_factor: usize,
}

impl Default for BigListConfig
{
    fn default() -> Self
    {
        BigListConfig {
            block_size: DEFAULT_BLOCK_SIZE,
            balance_factor: DEFAULT_BALANCE_FACTOR,
        }
    }
}

impl BigListConfig
{
    pub fn with_block_size(mut self, block_size: usize) -> Self
    {
        self.block_size = block_size;
        self
    }

    pub fn with_balance_factor(mut self, balance_factor: usize) -> Self
    {
        self.balance_factor = balance_factor;
        self
    }

    pub fn validate(&self) -> Result<()>
    {
        if self.block_size < MIN_BLOCK_SIZE {
            return Err(BigListError::InvalidConfiguration(format!(
                "block size {} is below the minimum of {MIN_BLOCK_SIZE}",
                self.block_size
            )));
        }
        if self.balance_factor < MIN_BALANCE_FACTOR {
            return Err(BigListError::InvalidConfiguration(format!(
                "balance factor {} is below the minimum of {MIN_BALANCE_FACTOR}",
                self.balance_factor
            )));
        }
        Ok(())
    }
}

/// Disk store parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig
{
    /// Containers kept resident
    pub cache_limit: usize,
    pub policy: CachePolicy,
    /// Record alignment in the backing file
    pub page_size: u64,
    pub compression: CompressionConfig,
    /// Leave the backing file behind when the store is dropped
    pub keep_file: bool,
    /// Where the backing file goes, the system temp dir when unset
    pub directory: Option<PathBuf>,
}

impl Default for StoreConfig
{
    fn default() -> Self
    {
        StoreConfig {
            cache_limit: DEFAULT_CACHE_LIMIT,
            policy: CachePolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
            compression: CompressionConfig::default(),
            keep_file: false,
            directory: None,
        }
    }
}

impl StoreConfig
{
    pub fn with_cache_limit(mut self, cache_limit: usize) -> Self
    {
        self.cache_limit = cache_limit;
        self
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self
    {
        self.policy = policy;
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self
    {
        self.page_size = page_size;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self
    {
        self.compression = compression;
        self
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self
    {
        self.directory = Some(directory.into());
        self
    }

    pub fn keep_file(mut self, keep_file: bool) -> Self
    {
        self.keep_file = keep_file;
        self
    }

    pub fn validate(&self) -> Result<()>
    {
        if self.cache_limit < MIN_CACHE_LIMIT {
            return Err(BigListError::InvalidConfiguration(format!(
                "cache limit {} is below the minimum of {MIN_CACHE_LIMIT}",
                self.cache_limit
            )));
        }
        if !self.page_size.is_power_of_two() {
            return Err(BigListError::InvalidConfiguration(format!(
                "page size {} is not a power of two",
                self.page_size
            )));
        }
        Ok(())
    }
}

/// Named bundle of list and store settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile
{
    pub list: BigListConfig,
    pub store: StoreConfig,
}

impl Profile
{
    pub fn from_yaml(yaml: &str) -> Result<Self>
    {
        let profile: Profile = serde_yml::from_str(yaml)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn default_profile() -> Result<Self>
    {
        Self::from_yaml(include_str!("../profiles/default.yaml"))
    }

    /// Character buffers
    pub fn text() -> Result<Self>
    {
        Self::from_yaml(include_str!("../profiles/text.yaml"))
    }

    /// Small fixed size records, e.g. line index entries
    pub fn records() -> Result<Self>
    {
        Self::from_yaml(include_str!("../profiles/records.yaml"))
    }

    pub fn validate(&self) -> Result<()>
    {
        self.list.validate()?;
        self.store.validate()
    }
}
