use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::de::{MapAccess, Visitor};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct MaterialName(pub String);

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct MarketId(pub String);

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct HotspotName(pub String);

impl Display for MaterialName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for MarketId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for HotspotName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entry of the material catalog. `price` and `timestamp` are scratch fields
/// left over from earlier runs; they are never read back as a price source.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Material {
    pub id: MarketId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// One quote as delivered by the exchange price service.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub id: MarketId,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPrice {
    pub price: f64,
    pub quoted_at: DateTime<Utc>,
}

/// Current price per material name, produced by joining quotes into the material catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    prices: HashMap<MaterialName, ResolvedPrice>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, material: MaterialName, resolved: ResolvedPrice) {
        self.prices.insert(material, resolved);
    }

    pub fn get(&self, material: &MaterialName) -> Option<&ResolvedPrice> {
        self.prices.get(material)
    }

    pub fn price_of(&self, material: &MaterialName) -> Option<f64> {
        self.prices.get(material).map(|resolved| resolved.price)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<(MaterialName, ResolvedPrice)> for PriceTable {
    fn from_iter<T: IntoIterator<Item = (MaterialName, ResolvedPrice)>>(iter: T) -> Self {
        Self {
            prices: iter.into_iter().collect(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DropTableEntry {
    pub name: MaterialName,
    pub percentage_chance: f64,
}

/// Static definition of a hotspot. Drop chances are independent weights and
/// are not required to sum up to 1.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Hotspot {
    pub level: u32,
    pub materials: Vec<DropTableEntry>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidHotspot {
    #[error("level must be at least 1, got {0}")]
    LevelBelowOne(u32),
    #[error("drop chance of '{material}' must be in (0, 1], got {chance}")]
    ChanceOutOfRange { material: MaterialName, chance: f64 },
}

impl Hotspot {
    pub fn validate(&self) -> Result<(), InvalidHotspot> {
        if self.level < 1 {
            return Err(InvalidHotspot::LevelBelowOne(self.level));
        }

        match self
            .materials
            .iter()
            .find(|entry| !(entry.percentage_chance > 0.0 && entry.percentage_chance <= 1.0))
        {
            Some(entry) => Err(InvalidHotspot::ChanceOutOfRange {
                material: entry.name.clone(),
                chance: entry.percentage_chance,
            }),
            None => Ok(()),
        }
    }

    pub fn material_names(&self) -> impl Iterator<Item = &MaterialName> + '_ {
        self.materials.iter().map(|entry| &entry.name)
    }
}

/// Fields derived by the valuation engine. Serialized next to the hotspot
/// definition with the same field names the snapshot file has always used.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HotspotMetrics {
    pub afk_factor: f64,
    pub avg_price: f64,
    pub score: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub price_volatility: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
}

/// Shape of one hotspot inside the persisted snapshot: the definition and,
/// if this hotspot could be valued, its derived fields.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct HotspotRecord {
    #[serde(flatten)]
    pub hotspot: Hotspot,
    #[serde(flatten)]
    pub metrics: Option<HotspotMetrics>,
}

/// Name -> entry mapping that keeps the insertion order of its source file.
/// Leaderboard tie-breaking relies on this order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedCatalog<K, V> {
    entries: Vec<(K, V)>,
}

pub type MaterialCatalog = OrderedCatalog<MaterialName, Material>;
pub type HotspotCatalog = OrderedCatalog<HotspotName, Hotspot>;
pub type HotspotSnapshot = OrderedCatalog<HotspotName, HotspotRecord>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("duplicate entry '{0}'")]
pub struct DuplicateEntry(pub String);

impl<K, V> Default for OrderedCatalog<K, V> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<K: PartialEq + Display, V> OrderedCatalog<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_from_entries(entries: Vec<(K, V)>) -> Result<Self, DuplicateEntry> {
        let mut catalog = Self::new();
        for (key, value) in entries {
            catalog.push(key, value)?;
        }
        Ok(catalog)
    }

    pub fn push(&mut self, key: K, value: V) -> Result<(), DuplicateEntry> {
        if self.entries.iter().any(|(existing, _)| existing == &key) {
            return Err(DuplicateEntry(key.to_string()));
        }
        self.entries.push((key, value));
        Ok(())
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries
            .iter()
            .find_map(|(existing, value)| (existing == key).then_some(value))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }
}

impl<K, V> OrderedCatalog<K, V> {
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<(K, V)> {
        self.entries
    }

    /// Same keys in the same order, new values.
    pub fn map_values<W>(&self, f: impl Fn(&K, &V) -> W) -> OrderedCatalog<K, W>
    where
        K: Clone,
    {
        OrderedCatalog {
            entries: self.entries.iter().map(|(key, value)| (key.clone(), f(key, value))).collect(),
        }
    }
}

impl MaterialCatalog {
    /// All market ids in catalog order, each id once. This is the batch sent to the price service.
    pub fn market_ids(&self) -> Vec<MarketId> {
        self.entries
            .iter()
            .map(|(_, material)| material.id.clone())
            .unique()
            .collect_vec()
    }

    /// Joins quotes into the catalog by market id.
    pub fn join_quotes(&self, quotes: &HashMap<MarketId, PriceQuote>) -> QuoteJoin {
        let known_ids: HashSet<&MarketId> = self.entries.iter().map(|(_, material)| &material.id).collect();

        let unresolved_quote_ids = quotes
            .keys()
            .filter(|id| !known_ids.contains(id))
            .cloned()
            .sorted()
            .collect_vec();

        let mut prices = PriceTable::new();
        let mut rejected_quotes = Vec::new();

        for (name, material) in self.entries.iter() {
            let Some(quote) = quotes.get(&material.id) else {
                continue;
            };
            if quote.price.is_finite() && quote.price >= 0.0 {
                prices.insert(
                    name.clone(),
                    ResolvedPrice {
                        price: quote.price,
                        quoted_at: quote.timestamp,
                    },
                );
            } else {
                rejected_quotes.push((name.clone(), quote.price));
            }
        }

        QuoteJoin {
            prices,
            unresolved_quote_ids,
            rejected_quotes,
        }
    }
}

/// Result of [`MaterialCatalog::join_quotes`]. The two diagnostic lists are
/// data quality findings that the caller reports; they never abort a run.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteJoin {
    pub prices: PriceTable,
    /// Quotes whose market id matches no catalog entry.
    pub unresolved_quote_ids: Vec<MarketId>,
    /// Materials whose quote carried a negative or non-finite price.
    pub rejected_quotes: Vec<(MaterialName, f64)>,
}

impl HotspotSnapshot {
    pub fn definitions(&self) -> HotspotCatalog {
        self.map_values(|_, record| record.hotspot.clone())
    }
}

impl<K, V> Serialize for OrderedCatalog<K, V>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(key, value)| (key, value)))
    }
}

impl<'de, K, V> Deserialize<'de> for OrderedCatalog<K, V>
where
    K: Deserialize<'de> + PartialEq + Display,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CatalogVisitor<K, V>(PhantomData<(K, V)>);

        impl<'de, K, V> Visitor<'de> for CatalogVisitor<K, V>
        where
            K: Deserialize<'de> + PartialEq + Display,
            V: Deserialize<'de>,
        {
            type Value = OrderedCatalog<K, V>;

            fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
                formatter.write_str("a mapping from name to catalog entry")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut catalog = OrderedCatalog::new();
                while let Some((key, value)) = access.next_entry::<K, V>()? {
                    catalog.push(key, value).map_err(de::Error::custom)?;
                }
                Ok(catalog)
            }
        }

        deserializer.deserialize_map(CatalogVisitor(PhantomData))
    }
}
