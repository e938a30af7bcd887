use std::collections::HashMap;

use uuid::Uuid;

use crate::db::models::Workflow;

#[derive(Default, Clone, Debug)]
pub struct WorkflowsRepo {
    workflows: HashMap<Uuid, Workflow>,
}

impl WorkflowsRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_workflow(&mut self, workflow: Workflow) -> &Workflow {
        let id = workflow.id;
        self.workflows.insert(id, workflow);
        &self.workflows[&id]
    }

    pub fn find_by_id(&self, workflow_id: Uuid) -> Option<&Workflow> {
        self.workflows.get(&workflow_id)
    }

    pub fn find_by_id_mut(&mut self, workflow_id: Uuid) -> Option<&mut Workflow> {
        self.workflows.get_mut(&workflow_id)
    }

    /// Active workflows ordered by name. With a project, global workflows
    /// (no project) are listed alongside the project's own.
    pub fn list(&self, project_id: Option<Uuid>, include_drafts: bool) -> Vec<&Workflow> {
        let mut list: Vec<&Workflow> = self
            .workflows
            .values()
            .filter(|w| w.is_active)
            .filter(|w| include_drafts || !w.is_draft)
            .filter(|w| match project_id {
                Some(pid) => w.project_id.is_none() || w.project_id == Some(pid),
                None => true,
            })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        list
    }

    pub fn find_draft_of(&self, workflow_id: Uuid) -> Option<&Workflow> {
        self.workflows
            .values()
            .find(|w| w.is_draft && w.draft_of == Some(workflow_id))
    }

    pub fn all(&self) -> impl Iterator<Item = &Workflow> {
        self.workflows.values()
    }

    pub fn delete_by_id(&mut self, workflow_id: Uuid) -> Option<Workflow> {
        self.workflows.remove(&workflow_id)
    }
}
