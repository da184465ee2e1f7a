use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 批量执行用的数据集：每个 case 是一组输入变量
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub agent_id: String,
    pub name: String,
    #[serde(default)]
    pub cases: Vec<BTreeMap<String, String>>,
}

impl Dataset {
    pub fn new(agent_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            name: name.into(),
            cases: Vec::new(),
        }
    }

    pub fn with_case<I, K, V>(mut self, case: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.cases
            .push(case.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }
}
