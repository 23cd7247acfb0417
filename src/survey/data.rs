use crate::error::{MtError, check_len};
use crate::survey::Survey;
use nalgebra::DVector;
use std::ops::Range;

/// Slice of the data vector produced by one receiver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataBlock {
    pub source: usize,
    pub receiver: usize,
    pub range: Range<usize>,
}

/// Data vector keyed by (source index, receiver index).
#[derive(Clone, Debug)]
pub struct Data {
    layout: Vec<DataBlock>,
    values: DVector<f64>,
}

impl Data {
    pub fn new(survey: &Survey, values: DVector<f64>) -> Result<Self, MtError> {
        check_len("data vector", survey.n_data(), values.len())?;
        Ok(Self {
            layout: survey.layout(),
            values,
        })
    }

    pub fn get(&self, source: usize, receiver: usize) -> Option<&[f64]> {
        self.layout
            .iter()
            .find(|b| b.source == source && b.receiver == receiver)
            .map(|b| &self.values.as_slice()[b.range.clone()])
    }

    pub fn as_vector(&self) -> &DVector<f64> {
        &self.values
    }

    pub fn into_vector(self) -> DVector<f64> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
