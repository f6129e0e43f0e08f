use serde::Serialize;

/// Listing envelope: the rows plus how many there are.
#[derive(Debug, Serialize)]
pub struct List<T> {
    list: Vec<T>,
    total: i64,
}

impl<T> From<Vec<T>> for List<T> {
    fn from(list: Vec<T>) -> Self {
        let total = list.len() as i64;
        List { list, total }
    }
}
