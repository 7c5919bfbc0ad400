pub mod resource_allocation;
