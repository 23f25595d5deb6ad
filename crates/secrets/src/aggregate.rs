// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! Folder-shaped tree of resolved secrets
//!
//! Each secret is inserted along the segments of its folder path. Secrets
//! Safe secrets end up under their title inside the last folder; a managed
//! account's folder path is `system/account`, and its last segment holds the
//! secret itself. Colliding keys are last-write-wins.

use indexmap::IndexMap;
use insight_models::ResolvedSecret;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Leaf(ResolvedSecret),
    Branch(IndexMap<String, Node>),
}

impl Node {
    pub fn as_leaf(&self) -> Option<&ResolvedSecret> {
        match self {
            Node::Leaf(secret) => Some(secret),
            Node::Branch(_) => None,
        }
    }

    pub fn as_branch(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Branch(children) => Some(children),
            Node::Leaf(_) => None,
        }
    }

    fn leaf_count(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Branch(children) => children.values().map(Node::leaf_count).sum(),
        }
    }
}

/// The aggregated result of a run; serializes as nested JSON objects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SecretTree {
    root: IndexMap<String, Node>,
}

impl SecretTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, secret: ResolvedSecret) {
        let folder_path = secret.folder_path().to_string();
        let segments: Vec<&str> = folder_path.split('/').collect();

        let (key, parents) = if secret.is_managed_account() {
            match segments.split_last() {
                Some((last, parents)) => (last.to_string(), parents),
                None => return,
            }
        } else {
            (
                secret.title().unwrap_or_default().to_string(),
                segments.as_slice(),
            )
        };

        // A leaf standing where a folder is needed is replaced by an empty folder
        let mut current = &mut self.root;
        for segment in parents {
            let node = current
                .entry(segment.to_string())
                .or_insert_with(|| Node::Branch(IndexMap::new()));
            if let Node::Leaf(_) = node {
                *node = Node::Branch(IndexMap::new());
            }
            let Node::Branch(children) = node else {
                return;
            };
            current = children;
        }
        current.insert(key, Node::Leaf(secret));
    }

    /// Fold `other` into this tree. Branches merge recursively; anything
    /// else at the same key is replaced by `other`'s node.
    pub fn merge(&mut self, other: SecretTree) {
        merge_into(&mut self.root, other.root);
    }

    /// Look up a node by its key path
    pub fn get(&self, path: &[&str]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.root.get(*first)?;
        for key in rest {
            node = node.as_branch()?.get(*key)?;
        }
        Some(node)
    }

    pub fn root(&self) -> &IndexMap<String, Node> {
        &self.root
    }

    /// Number of secrets in the tree
    pub fn len(&self) -> usize {
        self.root.values().map(Node::leaf_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl FromIterator<ResolvedSecret> for SecretTree {
    fn from_iter<I: IntoIterator<Item = ResolvedSecret>>(iter: I) -> Self {
        let mut tree = Self::new();
        for secret in iter {
            tree.insert(secret);
        }
        tree
    }
}

/// Build the tree from secrets in input order
pub fn aggregate(secrets: impl IntoIterator<Item = ResolvedSecret>) -> SecretTree {
    secrets.into_iter().collect()
}

fn merge_into(target: &mut IndexMap<String, Node>, source: IndexMap<String, Node>) {
    for (key, node) in source {
        if let Node::Branch(incoming) = node {
            if let Some(Node::Branch(existing)) = target.get_mut(&key) {
                merge_into(existing, incoming);
                continue;
            }
            target.insert(key, Node::Branch(incoming));
        } else {
            target.insert(key, node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_models::{CredentialSecret, ManagedAccount, ManagedAccountSecret};
    use serde_json::json;

    fn credential(folder: &str, title: &str, password: &str) -> ResolvedSecret {
        ResolvedSecret::Credential(CredentialSecret {
            title: title.to_string(),
            username: "user".to_string(),
            password: password.to_string(),
            folder_path: folder.to_string(),
        })
    }

    fn managed(system: &str, account: &str, password: &str) -> ResolvedSecret {
        let account = ManagedAccount {
            system_id: 1,
            account_id: 1,
            system_name: system.to_string(),
            account_name: account.to_string(),
        };
        ResolvedSecret::ManagedAccount(ManagedAccountSecret::new(&account, password))
    }

    #[test]
    fn test_credential_lands_under_title() {
        let tree = aggregate(vec![credential("folderA", "secretX", "pw")]);
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(
            json,
            json!({
                "folderA": {
                    "secretX": {
                        "Password": "pw",
                        "Title": "secretX",
                        "Username": "user",
                        "FolderPath": "folderA",
                        "FilePath": "",
                        "IsFileSecret": false
                    }
                }
            })
        );
    }

    #[test]
    fn test_managed_account_is_last_segment() {
        let tree = aggregate(vec![managed("srv01", "admin", "p@ss")]);
        let leaf = tree.get(&["srv01", "admin"]).and_then(Node::as_leaf).unwrap();
        assert_eq!(leaf.password(), "p@ss");
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_nested_folders() {
        let tree = aggregate(vec![
            credential("apps/billing", "db", "1"),
            credential("apps/billing", "cache", "2"),
            credential("apps", "root", "3"),
        ]);
        assert_eq!(tree.len(), 3);
        let billing = tree.get(&["apps", "billing"]).and_then(Node::as_branch).unwrap();
        assert_eq!(billing.keys().collect::<Vec<_>>(), vec!["db", "cache"]);
    }

    #[test]
    fn test_last_write_wins() {
        let tree = aggregate(vec![
            credential("folderA", "secretX", "old"),
            credential("folderA", "secretX", "new"),
        ]);
        assert_eq!(tree.len(), 1);
        let leaf = tree.get(&["folderA", "secretX"]).and_then(Node::as_leaf).unwrap();
        assert_eq!(leaf.password(), "new");
    }

    #[test]
    fn test_managed_account_overwrites_folder() {
        let tree = aggregate(vec![
            credential("srv01/admin", "note", "n"),
            managed("srv01", "admin", "p@ss"),
        ]);
        let node = tree.get(&["srv01", "admin"]).unwrap();
        assert_eq!(node.as_leaf().map(ResolvedSecret::password), Some("p@ss"));
    }

    #[test]
    fn test_folder_replaces_leaf_on_the_way() {
        let tree = aggregate(vec![
            managed("srv01", "admin", "p@ss"),
            credential("srv01/admin", "note", "n"),
        ]);
        assert!(tree.get(&["srv01", "admin", "note"]).is_some());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_merge_matches_concatenation_without_collisions() {
        let a = vec![
            credential("apps/billing", "db", "1"),
            managed("srv01", "admin", "2"),
        ];
        let b = vec![
            credential("apps/billing", "cache", "3"),
            credential("shared", "cert", "4"),
            managed("srv01", "root", "5"),
        ];

        let mut merged = aggregate(a.clone());
        merged.merge(aggregate(b.clone()));

        let combined = aggregate(a.into_iter().chain(b));
        assert_eq!(merged, combined);
        assert_eq!(merged.len(), 5);
    }

    #[test]
    fn test_merge_is_last_write_wins_on_collision() {
        let mut merged = aggregate(vec![credential("f", "t", "first")]);
        merged.merge(aggregate(vec![credential("f", "t", "second")]));
        let leaf = merged.get(&["f", "t"]).and_then(Node::as_leaf).unwrap();
        assert_eq!(leaf.password(), "second");
    }

    #[test]
    fn test_empty_tree_serializes_as_object() {
        let tree = SecretTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.to_json_pretty().unwrap(), "{}");
    }
}
