use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Point {
    pub name: String,

    pub tags: BTreeMap<String, String>,

    pub fields: BTreeMap<String, f64>,

    pub timestamp: Option<DateTime<Utc>>,
}

pub struct PointBuilder(Point);

impl PointBuilder {
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.tags.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, key: impl AsRef<str>, value: f64) -> Self {
        self.0.fields.insert(key.as_ref().to_string(), value);
        self
    }

    pub fn timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.0.timestamp = Some(ts);
        self
    }

    pub fn build(self) -> Point {
        self.0
    }
}

impl Point {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),

            tags: BTreeMap::new(),

            fields: BTreeMap::new(),

            timestamp: None,
        }
    }

    pub fn builder(name: impl Into<String>) -> PointBuilder {
        PointBuilder(Self::new(name))
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Points(Vec<Point>);

impl From<Vec<Point>> for Points {
    fn from(points: Vec<Point>) -> Self {
        Self(points)
    }
}

impl From<Point> for Points {
    fn from(point: Point) -> Self {
        Self(vec![point])
    }
}

impl Points {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.0.iter()
    }
}
