use crate::error::TreeError;
use crate::value::Value;
use indexmap::IndexMap;

/// Handle to a section in a [`ConfigTree`]. Stable for the lifetime of the
/// tree; sections are never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionId(usize);

#[derive(Debug)]
struct Node {
	name: String,
	parent: Option<SectionId>,
	content: IndexMap<String, Value>,
	children: IndexMap<String, SectionId>,
}

/// Result of a lookup: either a stored value or a section handle.
#[derive(Debug, PartialEq)]
pub enum Resolved<'a> {
	Value(&'a Value),
	Section(SectionId),
}

impl<'a> Resolved<'a> {
	pub fn value(self) -> Option<&'a Value> {
		match self {
			Resolved::Value(value) => Some(value),
			Resolved::Section(_) => None,
		}
	}

	pub fn section(self) -> Option<SectionId> {
		match self {
			Resolved::Value(_) => None,
			Resolved::Section(id) => Some(id),
		}
	}
}

/// A tree of named sections, each holding key/value content and child
/// sections.
///
/// Sections live in an arena and are addressed by [`SectionId`]; the parent
/// link is a back-reference used only to compute ancestry, so ownership stays
/// strictly top-down. Child and content iteration order is insertion order.
///
/// Keys passed to the lookup and mutation methods are either *bare* (no
/// separator — resolved by a breadth search over the subtree) or *paths*
/// (separator-delimited — normalized against the invoking section, then
/// resolved segment by segment). Leading separators are positional: the
/// leading run of `k` separators is replaced by the first `k` names of the
/// invoking section's own ancestry.
#[derive(Debug)]
pub struct ConfigTree {
	nodes: Vec<Node>,
	separator: String,
}

impl ConfigTree {
	/// Create a tree with the given root name and the default `/` separator.
	pub fn new(root_name: impl Into<String>) -> Self {
		Self::with_separator(root_name, "/")
	}

	/// Create a tree with an explicit separator. The separator is fixed for
	/// the lifetime of the tree and section names must not contain it.
	pub fn with_separator(root_name: impl Into<String>, separator: impl Into<String>) -> Self {
		ConfigTree {
			nodes: vec![Node {
				name: root_name.into(),
				parent: None,
				content: IndexMap::new(),
				children: IndexMap::new(),
			}],
			separator: separator.into(),
		}
	}

	pub fn root(&self) -> SectionId {
		SectionId(0)
	}

	pub fn separator(&self) -> &str {
		&self.separator
	}

	/// Total number of sections in the tree, root included.
	pub fn section_count(&self) -> usize {
		self.nodes.len()
	}

	fn node(&self, id: SectionId) -> &Node {
		&self.nodes[id.0]
	}

	pub fn name(&self, id: SectionId) -> &str {
		&self.node(id).name
	}

	pub fn parent(&self, id: SectionId) -> Option<SectionId> {
		self.node(id).parent
	}

	/// Section names from the root down to `id`, in order.
	fn path_names(&self, id: SectionId) -> Vec<String> {
		let mut names = Vec::new();
		let mut current = Some(id);
		while let Some(section) = current {
			names.push(self.node(section).name.clone());
			current = self.node(section).parent;
		}
		names.reverse();
		names
	}

	/// Separator-joined names from the root to this section. Unique
	/// tree-wide because sibling names are unique.
	pub fn full_path(&self, id: SectionId) -> String {
		self.path_names(id).join(&self.separator)
	}

	pub fn child(&self, id: SectionId, name: &str) -> Option<SectionId> {
		self.node(id).children.get(name).copied()
	}

	pub fn children(&self, id: SectionId) -> impl Iterator<Item = SectionId> + '_ {
		self.node(id).children.values().copied()
	}

	pub fn child_names(&self, id: SectionId) -> impl Iterator<Item = &str> {
		self.node(id).children.keys().map(String::as_str)
	}

	/// Content entries of this section, in insertion order.
	pub fn entries(&self, id: SectionId) -> impl Iterator<Item = (&str, &Value)> {
		self.node(id)
			.content
			.iter()
			.map(|(key, value)| (key.as_str(), value))
	}

	/// A value stored directly in this section.
	pub fn value_of(&self, id: SectionId, key: &str) -> Option<&Value> {
		self.node(id).content.get(key)
	}

	/// Normalize a key to a full path, relative to the section `at`.
	///
	/// A bare key (no separator) expands to a key directly under `at`.
	/// Otherwise, each separator in the leading run is replaced by the
	/// next name of `at`'s own ancestry, so `/x` means "under the root",
	/// `//x` "under the root's relevant child", and so on. A multi-segment
	/// key that starts with the name of an existing direct child gets an
	/// implicit leading separator, treating it as a path rather than a key.
	///
	/// A leading run longer than the ancestry of `at` is an error.
	pub fn expand(&self, at: SectionId, key: &str) -> Result<String, TreeError> {
		let mut parts: Vec<String> = key
			.split(self.separator.as_str())
			.map(str::to_string)
			.collect();
		if parts.len() == 1 {
			return Ok(format!(
				"{}{}{}",
				self.full_path(at),
				self.separator,
				key
			));
		}
		if !key.starts_with(self.separator.as_str()) && self.child(at, &parts[0]).is_some() {
			parts.insert(0, String::new());
		}
		let ancestry = self.path_names(at);
		for (i, part) in parts.iter_mut().enumerate() {
			if !part.is_empty() {
				break;
			}
			match ancestry.get(i) {
				Some(name) => *part = name.clone(),
				None => {
					return Err(TreeError::InvalidPath {
						path: key.to_string(),
					});
				}
			}
		}
		Ok(parts.join(&self.separator))
	}

	/// Normalize a key and split its segments into the leading run that
	/// already exists (walking from the root) and the missing remainder.
	pub fn split_existing(
		&self,
		at: SectionId,
		key: &str,
	) -> Result<(Vec<String>, Vec<String>), TreeError> {
		let path = self.expand(at, key)?;
		let mut segments: Vec<String> = path
			.split(self.separator.as_str())
			.map(str::to_string)
			.collect();
		let head = segments.remove(0);
		if head != self.node(self.root()).name {
			return Err(TreeError::InvalidPath { path });
		}
		let mut existing = vec![head];
		let mut section = self.root();
		let mut taken = 0;
		for segment in &segments {
			match self.child(section, segment) {
				Some(child) => {
					section = child;
					taken += 1;
				}
				None => break,
			}
		}
		let missing = segments.split_off(taken);
		existing.extend(segments);
		Ok((existing, missing))
	}

	/// Create every missing section along the normalized path, one node per
	/// missing segment. Returns the terminal section and the sections
	/// created, in order; idempotent when the path already exists.
	pub fn ensure_path(
		&mut self,
		at: SectionId,
		key: &str,
	) -> Result<(SectionId, Vec<SectionId>), TreeError> {
		let (existing, missing) = self.split_existing(at, key)?;

		let mut section = self.root();
		for name in existing.iter().skip(1) {
			section = self
				.child(section, name)
				.ok_or_else(|| TreeError::InvalidPath {
					path: key.to_string(),
				})?;
		}

		let mut created = Vec::new();
		for name in missing {
			if name.is_empty() {
				return Err(TreeError::InvalidPath {
					path: key.to_string(),
				});
			}
			let id = SectionId(self.nodes.len());
			self.nodes.push(Node {
				name: name.clone(),
				parent: Some(section),
				content: IndexMap::new(),
				children: IndexMap::new(),
			});
			let _ = self.nodes[section.0].children.insert(name, id);
			created.push(id);
			section = id;
		}
		Ok((section, created))
	}

	/// Insert or overwrite a value, resolving the key from the root.
	pub fn set(&mut self, key: &str, value: Value) -> Result<(), TreeError> {
		self.set_from(self.root(), key, value)
	}

	/// Insert or overwrite a value, resolving the key relative to `at`.
	///
	/// Every intermediate section must already exist; unlike
	/// [`ensure_path`](Self::ensure_path), assignment never creates
	/// sections.
	pub fn set_from(&mut self, at: SectionId, key: &str, value: Value) -> Result<(), TreeError> {
		let path = self.expand(at, key)?;
		let mut segments: Vec<String> = path
			.split(self.separator.as_str())
			.map(str::to_string)
			.collect();
		// The normalized path is root-anchored; drop the root segment.
		segments.remove(0);
		let Some(final_key) = segments.pop() else {
			return Err(TreeError::InvalidPath { path });
		};
		if final_key.is_empty() {
			return Err(TreeError::InvalidPath { path });
		}
		let mut section = self.root();
		for name in &segments {
			section =
				self.child(section, name)
					.ok_or_else(|| TreeError::MissingSubsection {
						path: path.clone(),
						missing: name.clone(),
					})?;
		}
		let _ = self.nodes[section.0].content.insert(final_key, value);
		Ok(())
	}

	/// Resolve a full path starting at the root's own name.
	///
	/// The terminal segment prefers a content value over a child section of
	/// the same name; a path ending in the separator resolves to the section
	/// itself.
	pub fn resolve(&self, path: &str) -> Result<Resolved<'_>, TreeError> {
		let mut segments: Vec<&str> = path.split(self.separator.as_str()).collect();
		let head = segments.remove(0);
		if head != self.node(self.root()).name {
			return Err(TreeError::InvalidPath {
				path: path.to_string(),
			});
		}
		let mut section = self.root();
		let mut iter = segments.into_iter().peekable();
		while let Some(segment) = iter.next() {
			let terminal = iter.peek().is_none();
			if terminal {
				if segment.is_empty() {
					return Ok(Resolved::Section(section));
				}
				if let Some(value) = self.node(section).content.get(segment) {
					return Ok(Resolved::Value(value));
				}
				if let Some(child) = self.child(section, segment) {
					return Ok(Resolved::Section(child));
				}
				return Err(TreeError::KeyNotFound {
					key: path.to_string(),
				});
			}
			section = self
				.child(section, segment)
				.ok_or_else(|| TreeError::KeyNotFound {
					key: path.to_string(),
				})?;
		}
		Ok(Resolved::Section(section))
	}

	/// Every content entry in the subtree of `at` whose key equals `name`,
	/// paired with its containing section, in traversal order.
	pub fn find_values(&self, at: SectionId, name: &str) -> Vec<(SectionId, &Value)> {
		let mut found = Vec::new();
		self.collect_values(at, name, &mut found);
		found
	}

	fn collect_values<'a>(
		&'a self,
		at: SectionId,
		name: &str,
		found: &mut Vec<(SectionId, &'a Value)>,
	) {
		if let Some(value) = self.node(at).content.get(name) {
			found.push((at, value));
		}
		for child in self.children(at) {
			self.collect_values(child, name, found);
		}
	}

	/// Every descendant section of `at` (the section itself excluded) whose
	/// name equals `name`, in traversal order.
	pub fn find_sections(&self, at: SectionId, name: &str) -> Vec<SectionId> {
		let mut found = Vec::new();
		self.collect_sections(at, name, &mut found);
		found
	}

	fn collect_sections(&self, at: SectionId, name: &str, found: &mut Vec<SectionId>) {
		for child in self.children(at) {
			if self.node(child).name == name {
				found.push(child);
			}
			self.collect_sections(child, name, found);
		}
	}

	/// Look a key up from the root. See [`get_from`](Self::get_from).
	pub fn get(&self, key: &str) -> Result<Resolved<'_>, TreeError> {
		self.get_from(self.root(), key)
	}

	/// Look a key up relative to `at`.
	///
	/// A separator-bearing key is normalized and resolved directly. A bare
	/// key is searched for across the whole subtree, matching both content
	/// keys and section names. A single match is returned as-is; with
	/// several matches, a candidate owned directly by `at` wins if it is
	/// the only direct one, otherwise the lookup is ambiguous and the error
	/// lists every candidate's full path.
	pub fn get_from(&self, at: SectionId, key: &str) -> Result<Resolved<'_>, TreeError> {
		if key.contains(self.separator.as_str()) {
			let path = self.expand(at, key)?;
			return self.resolve(&path);
		}

		let values = self.find_values(at, key);
		let sections = self.find_sections(at, key);

		match values.len() + sections.len() {
			0 => Err(TreeError::KeyNotFound {
				key: key.to_string(),
			}),
			1 => Ok(match values.first() {
				Some((_, value)) => Resolved::Value(value),
				None => Resolved::Section(sections[0]),
			}),
			_ => {
				let mut direct: Vec<Resolved<'_>> = Vec::new();
				for (container, value) in &values {
					if *container == at {
						direct.push(Resolved::Value(value));
					}
				}
				for section in &sections {
					if self.parent(*section) == Some(at) {
						direct.push(Resolved::Section(*section));
					}
				}
				let mut direct = direct.into_iter();
				match (direct.next(), direct.next()) {
					(Some(winner), None) => Ok(winner),
					_ => {
						let mut candidates: Vec<String> = values
							.iter()
							.map(|(container, _)| {
								format!(
									"{}{}{}",
									self.full_path(*container),
									self.separator,
									key
								)
							})
							.collect();
						candidates
							.extend(sections.iter().map(|section| self.full_path(*section)));
						Err(TreeError::AmbiguousKey {
							key: key.to_string(),
							candidates,
						})
					}
				}
			}
		}
	}

	/// Recursive export of the whole tree as nested [`Value::Map`]s.
	pub fn dump(&self) -> Value {
		self.dump_from(self.root())
	}

	/// Recursive export of the subtree rooted at `at`. Content entries come
	/// first; a child section whose name collides with a content key
	/// replaces that entry.
	pub fn dump_from(&self, at: SectionId) -> Value {
		let mut entries: Vec<(Value, Value)> = self
			.node(at)
			.content
			.iter()
			.map(|(key, value)| (Value::Str(key.clone()), value.clone()))
			.collect();
		for child in self.children(at) {
			let key = Value::Str(self.node(child).name.clone());
			let sub = self.dump_from(child);
			match entries.iter_mut().find(|(k, _)| *k == key) {
				Some(entry) => entry.1 = sub,
				None => entries.push((key, sub)),
			}
		}
		Value::Map(entries)
	}
}
