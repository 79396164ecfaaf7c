mod launch;
mod startup;
