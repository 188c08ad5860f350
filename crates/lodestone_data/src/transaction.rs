//! # Data transactions
//!
//! Every mutation of a value store reports its outcome as a
//! [`DataTransactionResult`]: the overall [`DataTransactionType`] plus the
//! values that were stored, rejected and replaced. Stores never drop data
//! silently; a refused offer lists the refused value under `rejected`.

use crate::error::DataError;
use crate::value::SharedValue;
use serde::{Deserialize, Serialize};

/// Overall classification of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataTransactionType {
    /// Nothing is known about the outcome
    Undefined,
    /// The transaction completed
    Success,
    /// The transaction was refused, usually for unsupported keys or out-of-range values
    Failure,
    /// The transaction failed unexpectedly
    Error,
    /// An event listener cancelled the transaction
    Cancelled,
}

/// Outcome record of an attempted mutation on a value store.
#[derive(Debug, Clone)]
pub struct DataTransactionResult {
    result_type: DataTransactionType,
    successful: Vec<SharedValue>,
    rejected: Vec<SharedValue>,
    replaced: Vec<SharedValue>,
}

impl DataTransactionResult {
    /// Starts an empty builder.
    pub fn builder() -> DataTransactionBuilder {
        DataTransactionBuilder::default()
    }

    /// A successful transaction that touched no data.
    pub fn success_no_data() -> Self {
        Self::of_type(DataTransactionType::Success)
    }

    /// A successful transaction storing `value`.
    pub fn success_result(value: SharedValue) -> Self {
        let mut result = Self::success_no_data();
        result.successful.push(value);
        result
    }

    /// A successful transaction storing `successful` in place of `replaced`.
    pub fn success_replace_result(successful: SharedValue, replaced: SharedValue) -> Self {
        let mut result = Self::success_result(successful);
        result.replaced.push(replaced);
        result
    }

    /// A failed transaction refusing `value`.
    pub fn fail_result(value: SharedValue) -> Self {
        let mut result = Self::fail_no_data();
        result.rejected.push(value);
        result
    }

    /// A failed transaction that touched no data.
    pub fn fail_no_data() -> Self {
        Self::of_type(DataTransactionType::Failure)
    }

    /// An erroneous transaction refusing `value`.
    pub fn error_result(value: SharedValue) -> Self {
        let mut result = Self::of_type(DataTransactionType::Error);
        result.rejected.push(value);
        result
    }

    fn of_type(result_type: DataTransactionType) -> Self {
        Self {
            result_type,
            successful: Vec::new(),
            rejected: Vec::new(),
            replaced: Vec::new(),
        }
    }

    pub fn result_type(&self) -> DataTransactionType {
        self.result_type
    }

    /// Returns `true` only for [`DataTransactionType::Success`].
    pub fn is_successful(&self) -> bool {
        self.result_type == DataTransactionType::Success
    }

    pub fn successful_data(&self) -> &[SharedValue] {
        &self.successful
    }

    pub fn rejected_data(&self) -> &[SharedValue] {
        &self.rejected
    }

    pub fn replaced_data(&self) -> &[SharedValue] {
        &self.replaced
    }

    /// Turns a non-successful result into an error.
    ///
    /// # Returns
    ///
    /// `DataError::OfferRejected` naming the first rejected key, or
    /// `DataError::TransactionFailed` when the failure carried no data.
    pub fn require_successful(&self) -> Result<&Self, DataError> {
        if self.is_successful() {
            return Ok(self);
        }
        match self.rejected.first() {
            Some(value) => Err(DataError::OfferRejected {
                key: value.key_id().clone(),
            }),
            None => Err(DataError::TransactionFailed(self.result_type)),
        }
    }

    /// Marks this result as cancelled, moving successful values to rejected.
    pub fn into_cancelled(mut self) -> Self {
        self.result_type = DataTransactionType::Cancelled;
        self.rejected.append(&mut self.successful);
        self.replaced.clear();
        self
    }
}

/// Incrementally assembles a [`DataTransactionResult`].
#[derive(Debug, Default)]
pub struct DataTransactionBuilder {
    result_type: Option<DataTransactionType>,
    successful: Vec<SharedValue>,
    rejected: Vec<SharedValue>,
    replaced: Vec<SharedValue>,
}

impl DataTransactionBuilder {
    pub fn result(mut self, result_type: DataTransactionType) -> Self {
        self.result_type = Some(result_type);
        self
    }

    pub fn success(mut self, value: SharedValue) -> Self {
        self.successful.push(value);
        self
    }

    pub fn success_all(mut self, values: impl IntoIterator<Item = SharedValue>) -> Self {
        self.successful.extend(values);
        self
    }

    pub fn reject(mut self, value: SharedValue) -> Self {
        self.rejected.push(value);
        self
    }

    pub fn reject_all(mut self, values: impl IntoIterator<Item = SharedValue>) -> Self {
        self.rejected.extend(values);
        self
    }

    pub fn replace(mut self, value: SharedValue) -> Self {
        self.replaced.push(value);
        self
    }

    pub fn replace_all(mut self, values: impl IntoIterator<Item = SharedValue>) -> Self {
        self.replaced.extend(values);
        self
    }

    /// Folds a later result into this builder.
    ///
    /// For every value already held, the later result decides its fate by
    /// key: rejected there means rejected here, replaced there means the held
    /// value was replaced, and successful there means the later value wins.
    /// Values only known to the later result are appended to their category.
    /// A non-success type is upgraded when the later result succeeded.
    pub fn absorb_result(mut self, result: &DataTransactionResult) -> Self {
        self.result_type = match self.result_type {
            None => Some(result.result_type),
            Some(current)
                if current != DataTransactionType::Success && result.is_successful() =>
            {
                Some(DataTransactionType::Success)
            }
            keep => keep,
        };

        let mut new_successful = Vec::new();
        let mut new_replaced = Vec::new();
        let mut new_rejected = Vec::new();

        let held = [
            (std::mem::take(&mut self.successful), Category::Successful),
            (std::mem::take(&mut self.replaced), Category::Replaced),
            (std::mem::take(&mut self.rejected), Category::Rejected),
        ];
        for (values, fallback) in held {
            for value in values {
                if let Some(rejected) = find_key(&result.rejected, &value) {
                    new_rejected.push(rejected.clone());
                } else if find_key(&result.replaced, &value).is_some() {
                    new_replaced.push(value);
                } else if let Some(successful) = find_key(&result.successful, &value) {
                    new_successful.push(successful.clone());
                } else {
                    match fallback {
                        Category::Successful => new_successful.push(value),
                        Category::Replaced => new_replaced.push(value),
                        Category::Rejected => new_rejected.push(value),
                    }
                }
            }
        }

        let incoming = [
            (&result.successful, Category::Successful),
            (&result.rejected, Category::Rejected),
            (&result.replaced, Category::Replaced),
        ];
        for (values, category) in incoming {
            for value in values {
                let known = find_key(&new_rejected, value).is_some()
                    || find_key(&new_replaced, value).is_some()
                    || find_key(&new_successful, value).is_some();
                if known {
                    continue;
                }
                match category {
                    Category::Successful => new_successful.push(value.clone()),
                    Category::Replaced => new_replaced.push(value.clone()),
                    Category::Rejected => new_rejected.push(value.clone()),
                }
            }
        }

        self.successful = new_successful;
        self.replaced = new_replaced;
        self.rejected = new_rejected;
        self
    }

    /// Finishes the result.
    ///
    /// # Returns
    ///
    /// `Err(DataError::IncompleteResult)` when no result type was set.
    pub fn build(self) -> Result<DataTransactionResult, DataError> {
        let result_type = self.result_type.ok_or(DataError::IncompleteResult)?;
        Ok(DataTransactionResult {
            result_type,
            successful: self.successful,
            rejected: self.rejected,
            replaced: self.replaced,
        })
    }
}

#[derive(Clone, Copy)]
enum Category {
    Successful,
    Replaced,
    Rejected,
}

fn find_key<'a>(values: &'a [SharedValue], needle: &SharedValue) -> Option<&'a SharedValue> {
    values.iter().find(|value| value.key_id() == needle.key_id())
}
