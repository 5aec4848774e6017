use std::ops::ControlFlow;

use serde_json::Value;

use super::{Changeset, Row, StorageBackend};
use crate::criteria::Criteria;
use crate::error::{ModelError, ModelResult};
use crate::model::ModelType;

/// Backend for model types with no storage attached. Every operation fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStorage;

fn unimplemented(operation: &'static str, model: &ModelType) -> ModelError {
    ModelError::Unimplemented {
        operation,
        model: model.name().to_string(),
    }
}

impl StorageBackend for NullStorage {
    fn name(&self) -> &'static str {
        "null"
    }

    fn save(&self, model: &ModelType, _changes: &Changeset<'_>) -> ModelResult<Value> {
        Err(unimplemented("save", model))
    }

    fn delete(&self, model: &ModelType, _id: Option<&Value>) -> ModelResult<bool> {
        Err(unimplemented("delete", model))
    }

    fn find(&self, model: &ModelType, _id: &Value) -> ModelResult<Option<Row>> {
        Err(unimplemented("find", model))
    }

    fn scan(
        &self,
        model: &ModelType,
        _criteria: &Criteria,
        _visit: &mut dyn FnMut(Row) -> ControlFlow<()>,
    ) -> ModelResult<()> {
        Err(unimplemented("scan", model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Field;

    static THING: ModelType = ModelType::new("Thing", &[Field::stored("id")]);

    #[test]
    fn every_operation_fails() {
        let storage = NullStorage;
        let row = Row::new();
        let changes = Changeset {
            id: None,
            values: &row,
            fields: &[],
        };

        assert!(matches!(
            storage.save(&THING, &changes),
            Err(ModelError::Unimplemented { operation: "save", .. })
        ));
        assert!(matches!(
            storage.delete(&THING, None),
            Err(ModelError::Unimplemented { operation: "delete", .. })
        ));
        assert!(matches!(
            storage.find(&THING, &Value::from(1)),
            Err(ModelError::Unimplemented { operation: "find", .. })
        ));
        let mut visit = |_row: Row| ControlFlow::Continue(());
        let err = storage
            .scan(&THING, &Criteria::new(), &mut visit)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "scan is not implemented for Thing: no storage attached"
        );
    }
}
